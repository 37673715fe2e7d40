// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use nix::sched::{CloneFlags, setns};

use crate::procfs;

pub type Ino = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Net,
    Ipc,
    Mnt,
}

impl NamespaceKind {
    /// Name of the entry under `/proc/<pid>/ns`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceKind::Net => "net",
            NamespaceKind::Ipc => "ipc",
            NamespaceKind::Mnt => "mnt",
        }
    }

    fn clone_flag(&self) -> CloneFlags {
        match self {
            NamespaceKind::Net => CloneFlags::CLONE_NEWNET,
            NamespaceKind::Ipc => CloneFlags::CLONE_NEWIPC,
            NamespaceKind::Mnt => CloneFlags::CLONE_NEWNS,
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The target already shares the namespace with us.
    Unchanged,
    Changed,
}

pub trait NamespaceEntry {
    fn enter(&self, pid: i32, kind: NamespaceKind) -> io::Result<Transition>;
}

/// Joins namespaces with `setns(2)` through the namespace files in procfs.
pub struct ProcfsNamespaces {
    root: PathBuf,
}

impl ProcfsNamespaces {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn ns_path(&self, pid: &str, kind: NamespaceKind) -> PathBuf {
        self.root.join(pid).join("ns").join(kind.as_str())
    }

    fn ns_ino(&self, pid: &str, kind: NamespaceKind) -> io::Result<Ino> {
        Ok(fs::metadata(self.ns_path(pid, kind))?.ino())
    }
}

impl Default for ProcfsNamespaces {
    fn default() -> Self {
        Self::new(procfs::root_path())
    }
}

impl NamespaceEntry for ProcfsNamespaces {
    fn enter(&self, pid: i32, kind: NamespaceKind) -> io::Result<Transition> {
        let pid = pid.to_string();
        let target_ino = self.ns_ino(&pid, kind)?;

        if self.ns_ino("self", kind)? == target_ino {
            return Ok(Transition::Unchanged);
        }

        let file = File::open(self.ns_path(&pid, kind))?;
        setns(&file, kind.clone_flag()).map_err(io::Error::from)?;
        Ok(Transition::Changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_enter_own_namespaces_is_unchanged() {
        let namespaces = ProcfsNamespaces::new("/proc");
        let pid = i32::try_from(std::process::id()).unwrap();

        for kind in [NamespaceKind::Net, NamespaceKind::Ipc, NamespaceKind::Mnt] {
            assert_eq!(
                namespaces.enter(pid, kind).unwrap(),
                Transition::Unchanged,
                "{kind}"
            );
        }
    }

    #[test]
    fn test_enter_missing_process() {
        let root = TempDir::new().unwrap();
        let namespaces = ProcfsNamespaces::new(root.path());
        let err = namespaces.enter(4242, NamespaceKind::Mnt).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NamespaceKind::Net.to_string(), "net");
        assert_eq!(NamespaceKind::Ipc.to_string(), "ipc");
        assert_eq!(NamespaceKind::Mnt.to_string(), "mnt");
    }
}
