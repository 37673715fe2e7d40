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

use std::env;
use std::process;

use anyhow::{Context, Result};
use dd_jattach::cli::{self, CliError, Request};
use dd_jattach::config::{self, Config};
use dd_jattach::errors::FAILURE_EXIT_CODE;
use dd_jattach::identity::ProcessIdentitySwitcher;
use dd_jattach::listener::SigquitSignaller;
use dd_jattach::namespace::ProcfsNamespaces;
use dd_jattach::procfs::{self, ProcfsLocator};
use dd_jattach::relay::{output_channel, spawn_relay};
use dd_jattach::tmp_path::ProcfsTempPath;
use dd_jattach::{Attacher, LOG_TARGET};
use log::{debug, error, warn};
use tokio::runtime::Runtime;

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn report_usage_error(e: &CliError) {
    match e {
        CliError::Display(help) => {
            let _ = help.print();
        }
        e if e.is_stderr() => eprintln!("{e}"),
        e => println!("{e}"),
    }
}

#[allow(clippy::print_stderr)]
fn init_logging(level: log::Level) {
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("failed to initialize logging: {e}");
    }
}

// Joining a mount namespace requires a single-threaded process.
fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}

async fn run(request: Request, config: Config) -> i32 {
    let (tx, rx) = output_channel();
    let relay = spawn_relay(rx, tokio::io::stdout());

    let locator = ProcfsLocator::default();
    let namespaces = ProcfsNamespaces::default();
    let tmp_paths = ProcfsTempPath::new(config.tmp_path);
    let attacher = Attacher {
        locator: &locator,
        namespaces: &namespaces,
        tmp_paths: &tmp_paths,
        identity: &ProcessIdentitySwitcher,
        signaller: &SigquitSignaller,
        proc_root: procfs::root_path(),
        schedule: config.schedule,
    };

    let code = attacher.attach(request.pid, &request.args, tx).await;

    match relay.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(target: LOG_TARGET, "stdout closed early: {e}"),
        Err(e) => error!(target: LOG_TARGET, "output relay failed: {e}"),
    }
    code
}

fn main() {
    let request = match cli::parse(env::args_os()) {
        Ok(request) => request,
        Err(e) => {
            report_usage_error(&e);
            process::exit(e.exit_code());
        }
    };

    let yaml = config::load_config(request.config_path.clone());
    let log_level = config::get_log_level(&yaml);
    init_logging(log_level);
    debug!(target: LOG_TARGET, "log level set to: {log_level:?}");
    if let Err(e) = &yaml {
        warn!(target: LOG_TARGET, "{e:#}");
    }
    let config = Config::from_yaml(&yaml);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(target: LOG_TARGET, "{e:#}");
            process::exit(FAILURE_EXIT_CODE);
        }
    };

    let code = runtime.block_on(run(request, config));
    process::exit(code);
}
