// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod attach;
pub mod cli;
pub mod config;
pub mod errors;
pub mod hotspot;
pub mod identity;
pub mod listener;
pub mod namespace;
pub mod procfs;
pub mod protocol;
pub mod relay;
pub mod tmp_path;

/// Log target shared by every message, used as the component label.
pub const LOG_TARGET: &str = "jattach";

pub use attach::{Attacher, Target};
pub use config::Config;
pub use errors::{Error, Stage};
pub use listener::PollSchedule;
