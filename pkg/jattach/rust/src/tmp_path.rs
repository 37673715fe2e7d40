// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TMP_PATH: &str = "/tmp";

/// Finds the directory where the JVM creates `.java_pid<N>` and looks for
/// `.attach_pid<N>`.
pub trait TempPathResolver {
    /// `proc_root` is the procfs mount in which `attach_pid` is valid.
    fn tmp_path(&self, proc_root: &Path, attach_pid: i32) -> PathBuf;
}

#[derive(Debug, Default)]
pub struct ProcfsTempPath {
    configured: Option<PathBuf>,
}

impl ProcfsTempPath {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { configured }
    }
}

impl TempPathResolver for ProcfsTempPath {
    fn tmp_path(&self, proc_root: &Path, attach_pid: i32) -> PathBuf {
        if let Some(path) = &self.configured {
            return path.clone();
        }

        // A chrooted process sees /tmp under its own root.
        let root_link = proc_root.join(attach_pid.to_string()).join("root");
        match fs::read_link(root_link) {
            Ok(root) if root != Path::new("/") && !root.as_os_str().is_empty() => {
                root.join("tmp")
            }
            _ => PathBuf::from(DEFAULT_TMP_PATH),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn fake_proc(pid: i32, root_target: &str) -> TempDir {
        let proc_root = TempDir::new().unwrap();
        let pid_dir = proc_root.path().join(pid.to_string());
        fs::create_dir(&pid_dir).unwrap();
        symlink(root_target, pid_dir.join("root")).unwrap();
        proc_root
    }

    #[test]
    fn test_plain_root_uses_tmp() {
        let proc_root = fake_proc(10, "/");
        let resolver = ProcfsTempPath::default();
        assert_eq!(
            resolver.tmp_path(proc_root.path(), 10),
            PathBuf::from("/tmp")
        );
    }

    #[test]
    fn test_chroot_root_is_prefixed() {
        let proc_root = fake_proc(10, "/var/lib/chroot/app");
        let resolver = ProcfsTempPath::default();
        assert_eq!(
            resolver.tmp_path(proc_root.path(), 10),
            PathBuf::from("/var/lib/chroot/app/tmp")
        );
    }

    #[test]
    fn test_root_is_read_from_given_proc_root() {
        let host_proc = fake_proc(10, "/var/lib/chroot/host-view");
        let target_proc = fake_proc(10, "/");
        let resolver = ProcfsTempPath::default();
        assert_eq!(
            resolver.tmp_path(target_proc.path(), 10),
            PathBuf::from("/tmp")
        );
        assert_eq!(
            resolver.tmp_path(host_proc.path(), 10),
            PathBuf::from("/var/lib/chroot/host-view/tmp")
        );
    }

    #[test]
    fn test_unreadable_root_falls_back_to_tmp() {
        let proc_root = TempDir::new().unwrap();
        let resolver = ProcfsTempPath::default();
        assert_eq!(
            resolver.tmp_path(proc_root.path(), 10),
            PathBuf::from("/tmp")
        );
    }

    #[test]
    fn test_configured_path_wins() {
        let proc_root = fake_proc(10, "/var/lib/chroot/app");
        let resolver = ProcfsTempPath::new(Some(PathBuf::from("/run/jvm-tmp")));
        assert_eq!(
            resolver.tmp_path(proc_root.path(), 10),
            PathBuf::from("/run/jvm-tmp")
        );
    }
}
