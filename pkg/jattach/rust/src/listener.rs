// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::LOG_TARGET;
use crate::errors::Error;

pub const DEFAULT_ATTACH_ATTEMPTS: u32 = 300;
pub const DEFAULT_ATTACH_INTERVAL: Duration = Duration::from_millis(20);

pub fn socket_path(tmp_path: &Path, ns_pid: i32) -> PathBuf {
    tmp_path.join(format!(".java_pid{ns_pid}"))
}

/// Whether the JVM has already opened its attach socket. A regular file at
/// the same path does not count.
pub fn check_socket(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.file_type().is_socket())
}

/// Linearly increasing delays between checks for the attach socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTACH_ATTEMPTS,
            interval: DEFAULT_ATTACH_INTERVAL,
        }
    }
}

impl PollSchedule {
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let interval = self.interval;
        (1..=self.attempts).map(move |i| interval.saturating_mul(i))
    }
}

pub trait Signaller {
    /// Asks the JVM to start its attach listener.
    fn request_listener(&self, pid: i32) -> io::Result<()>;
}

/// HotSpot starts the attach listener on SIGQUIT when it finds an
/// `.attach_pid<N>` file.
pub struct SigquitSignaller;

impl Signaller for SigquitSignaller {
    fn request_listener(&self, pid: i32) -> io::Result<()> {
        signal::kill(Pid::from_raw(pid), Signal::SIGQUIT).map_err(io::Error::from)
    }
}

/// Marker file removed when dropped.
#[derive(Debug)]
pub struct TriggerFile {
    path: PathBuf,
}

impl TriggerFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the marker at the first candidate that can be created and ends
    /// up owned by `euid`.
    pub fn create<I>(candidates: I, euid: u32) -> io::Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no trigger file candidates");

        for path in candidates {
            if let Err(e) = File::create(&path) {
                debug!(target: LOG_TARGET, "could not create {}: {e}", path.display());
                last_error = e;
                continue;
            }

            let trigger = TriggerFile { path };
            match fs::metadata(&trigger.path) {
                Ok(m) if m.uid() == euid => return Ok(trigger),
                Ok(m) => {
                    debug!(
                        target: LOG_TARGET,
                        "{} is owned by uid {} instead of {euid}",
                        trigger.path.display(),
                        m.uid()
                    );
                    last_error = io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("{} has the wrong owner", trigger.path.display()),
                    );
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }
}

impl Drop for TriggerFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(target: LOG_TARGET, "failed to remove {}: {e}", self.path.display());
        }
    }
}

/// Where the JVM looks for the trigger file: its working directory first,
/// since it is checked before the temp directory, then the temp directory.
pub fn trigger_candidates(
    proc_root: &Path,
    attach_pid: i32,
    ns_pid: i32,
    tmp_path: &Path,
) -> Vec<PathBuf> {
    let name = format!(".attach_pid{ns_pid}");
    vec![
        proc_root.join(attach_pid.to_string()).join("cwd").join(&name),
        tmp_path.join(name),
    ]
}

/// What the listener startup needs to know about the target.
#[derive(Debug, Clone)]
pub struct ListenerTarget<'a> {
    /// PID visible from our PID namespace, used for signaling.
    pub pid: i32,
    pub ns_pid: i32,
    /// PID valid in the current mount namespace, used for `/proc` paths.
    pub attach_pid: i32,
    pub tmp_path: &'a Path,
    pub proc_root: &'a Path,
    pub euid: u32,
}

/// Makes sure the attach socket exists, forcing the JVM to create it if
/// needed.
pub async fn ensure_listener<S: Signaller + ?Sized>(
    target: &ListenerTarget<'_>,
    signaller: &S,
    schedule: PollSchedule,
) -> Result<PathBuf, Error> {
    let socket = socket_path(target.tmp_path, target.ns_pid);
    if check_socket(&socket) {
        debug!(target: LOG_TARGET, "attach socket {} already open", socket.display());
        return Ok(socket);
    }

    let candidates = trigger_candidates(
        target.proc_root,
        target.attach_pid,
        target.ns_pid,
        target.tmp_path,
    );
    let trigger = TriggerFile::create(candidates, target.euid).map_err(|e| Error::ListenerStart {
        context: format!("could not create trigger file: {e}"),
    })?;
    debug!(target: LOG_TARGET, "created trigger file {}", trigger.path().display());

    // Not fatal: the socket may still appear.
    if let Err(e) = signaller.request_listener(target.pid) {
        warn!(target: LOG_TARGET, "could not signal pid {}: {e}", target.pid);
    }

    for (attempt, delay) in schedule.delays().enumerate() {
        tokio::time::sleep(delay).await;
        if check_socket(&socket) {
            info!(
                target: LOG_TARGET,
                "attach listener started after {} checks",
                attempt + 1
            );
            return Ok(socket);
        }
    }

    Err(Error::ListenerStart {
        context: format!(
            "{} did not appear after {} checks",
            socket.display(),
            schedule.attempts
        ),
    })
}
