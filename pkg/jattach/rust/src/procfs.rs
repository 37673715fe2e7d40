// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static PROC_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Where procfs is found after joining another mount namespace. `HOST_PROC`
/// only describes our own mount namespace.
pub const NAMESPACE_PROC_ROOT: &str = "/proc";

pub fn root_path() -> &'static Path {
    PROC_ROOT.get_or_init(|| {
        if let Ok(v) = env::var("HOST_PROC") {
            return v.into();
        }

        if env::var("DOCKER_DD_AGENT").is_ok() && Path::new("/host").exists() {
            return "/host/proc".into();
        }

        "/proc".into()
    })
}

/// Identity of a target process as read from `/proc/<pid>/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    /// PID of the process inside its own (innermost) PID namespace.
    pub ns_pid: i32,
    pub uid: u32,
    pub gid: u32,
}

pub trait ProcessLocator {
    fn locate(&self, pid: i32) -> io::Result<ProcessInfo>;
}

/// Reads process information from a procfs mount.
pub struct ProcfsLocator {
    root: PathBuf,
}

impl ProcfsLocator {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsLocator {
    fn default() -> Self {
        Self::new(root_path())
    }
}

impl ProcessLocator for ProcfsLocator {
    fn locate(&self, pid: i32) -> io::Result<ProcessInfo> {
        let path = self.root.join(pid.to_string()).join("status");
        let status = fs::read_to_string(path)?;
        parse_status(pid, &status)
    }
}

fn invalid_data(context: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, context.to_string())
}

/// Uid/Gid lines list real, effective, saved and filesystem ids in that order.
fn effective_id(value: &str) -> Option<u32> {
    value.split_whitespace().nth(1)?.parse().ok()
}

fn parse_status(pid: i32, status: &str) -> io::Result<ProcessInfo> {
    let mut uid = None;
    let mut gid = None;
    let mut ns_pid = None;

    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key {
            "Uid" => uid = effective_id(value),
            "Gid" => gid = effective_id(value),
            // The last entry is the PID in the innermost namespace.
            "NStgid" => ns_pid = value.split_whitespace().last().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    Ok(ProcessInfo {
        // Kernels before 4.1 have no NStgid line.
        ns_pid: ns_pid.unwrap_or(pid),
        uid: uid.ok_or_else(|| invalid_data("missing Uid line in process status"))?,
        gid: gid.ok_or_else(|| invalid_data("missing Gid line in process status"))?,
    })
}
