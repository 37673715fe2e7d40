// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::error::Error as _;
use std::path::Path;

use log::{debug, error, warn};
use nix::sys::signal::{self, SigHandler, Signal};
use tokio::sync::mpsc::UnboundedSender;

use crate::LOG_TARGET;
use crate::errors::Error;
use crate::hotspot::attach_hotspot;
use crate::identity::{Identity, IdentitySwitcher, match_identity};
use crate::listener::{ListenerTarget, PollSchedule, Signaller};
use crate::namespace::{NamespaceEntry, NamespaceKind, Transition};
use crate::procfs::{NAMESPACE_PROC_ROOT, ProcessInfo, ProcessLocator};
use crate::tmp_path::TempPathResolver;

/// The process being attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub pid: i32,
    pub ns_pid: i32,
    pub uid: u32,
    pub gid: u32,
    /// PID to use for `/proc` paths once namespaces are joined.
    pub attach_pid: i32,
    /// Whether the target's mount namespace was joined.
    pub joined_mnt: bool,
}

impl Target {
    pub fn new(pid: i32, info: ProcessInfo, mnt_changed: bool) -> Self {
        Self {
            pid,
            ns_pid: info.ns_pid,
            uid: info.uid,
            gid: info.gid,
            attach_pid: if mnt_changed { info.ns_pid } else { pid },
            joined_mnt: mnt_changed,
        }
    }

    /// Procfs root in which `attach_pid` is valid.
    pub fn proc_root<'a>(&self, host_proc_root: &'a Path) -> &'a Path {
        if self.joined_mnt {
            Path::new(NAMESPACE_PROC_ROOT)
        } else {
            host_proc_root
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.uid,
            gid: self.gid,
        }
    }
}

/// Attaches to a JVM, possibly in another container, and runs one command.
pub struct Attacher<'a> {
    pub locator: &'a dyn ProcessLocator,
    pub namespaces: &'a dyn NamespaceEntry,
    pub tmp_paths: &'a dyn TempPathResolver,
    pub identity: &'a dyn IdentitySwitcher,
    pub signaller: &'a dyn Signaller,
    /// Procfs root of our own mount namespace.
    pub proc_root: &'a Path,
    pub schedule: PollSchedule,
}

impl Attacher<'_> {
    /// Sends `args` to the JVM with the given PID and returns the exit code:
    /// the JVM status on a completed exchange, 1 on failure.
    ///
    /// Output is sent to `out`, which is closed when this returns.
    pub async fn attach<A: AsRef<str>>(
        &self,
        pid: i32,
        args: &[A],
        out: UnboundedSender<Vec<u8>>,
    ) -> i32 {
        match self.run(pid, args, &out).await {
            Ok(status) => status,
            Err(e) => {
                match e.source() {
                    Some(source) => error!(
                        target: LOG_TARGET,
                        "{e}: {source} (pid={pid}, stage={})",
                        e.stage()
                    ),
                    None => error!(target: LOG_TARGET, "{e} (pid={pid}, stage={})", e.stage()),
                }
                e.exit_code()
            }
        }
    }

    async fn run<A: AsRef<str>>(
        &self,
        pid: i32,
        args: &[A],
        out: &UnboundedSender<Vec<u8>>,
    ) -> Result<i32, Error> {
        let current = self.identity.effective();

        // Resolved before any namespace or credential change, while /proc
        // still refers to the caller's view of the process.
        let info = self.locator.locate(pid).map_err(Error::ProcessNotFound)?;

        // Network and IPC namespaces are essential for OpenJ9 connection.
        for kind in [NamespaceKind::Net, NamespaceKind::Ipc] {
            if let Err(e) = self.namespaces.enter(pid, kind) {
                debug!(target: LOG_TARGET, "could not enter {kind} namespace of pid {pid}: {e}");
            }
        }
        let mnt_changed = match self.namespaces.enter(pid, NamespaceKind::Mnt) {
            Ok(transition) => transition == Transition::Changed,
            Err(e) => {
                debug!(target: LOG_TARGET, "could not enter mnt namespace of pid {pid}: {e}");
                false
            }
        };

        let target = Target::new(pid, info, mnt_changed);
        let identity = match_identity(current, target.identity(), self.identity)?;
        debug!(target: LOG_TARGET, "attaching to {target:?}");

        let proc_root = target.proc_root(self.proc_root);
        let tmp_path = self.tmp_paths.tmp_path(proc_root, target.attach_pid);

        ignore_sigpipe();

        let listener_target = ListenerTarget {
            pid: target.pid,
            ns_pid: target.ns_pid,
            attach_pid: target.attach_pid,
            tmp_path: &tmp_path,
            proc_root,
            euid: identity.uid,
        };
        attach_hotspot(&listener_target, self.signaller, self.schedule, args, out).await
    }
}

/// Makes write() return EPIPE instead of killing the process when stdout is
/// closed early.
fn ignore_sigpipe() {
    // SAFETY: SIG_IGN does not run any code in signal context.
    if let Err(e) = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigIgn) } {
        warn!(target: LOG_TARGET, "could not ignore SIGPIPE: {e}");
    }
}
