// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::io;

use log::debug;
use uzers::{gid_t, uid_t};

use crate::LOG_TARGET;
use crate::errors::Error;

/// Effective user and group ids of a process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: uid_t,
    pub gid: gid_t,
}

impl Identity {
    pub fn current() -> Self {
        Self {
            uid: uzers::get_effective_uid(),
            gid: uzers::get_effective_gid(),
        }
    }
}

pub trait IdentitySwitcher {
    fn effective(&self) -> Identity;
    fn set_effective_gid(&self, gid: gid_t) -> io::Result<()>;
    fn set_effective_uid(&self, uid: uid_t) -> io::Result<()>;
}

/// Changes the effective ids of the whole process.
pub struct ProcessIdentitySwitcher;

impl IdentitySwitcher for ProcessIdentitySwitcher {
    fn effective(&self) -> Identity {
        Identity::current()
    }

    fn set_effective_gid(&self, gid: gid_t) -> io::Result<()> {
        uzers::switch::set_effective_gid(gid)
    }

    fn set_effective_uid(&self, uid: uid_t) -> io::Result<()> {
        uzers::switch::set_effective_uid(uid)
    }
}

/// HotSpot only accepts attach clients with the same euid/egid as the JVM.
///
/// Switches to the target identity if needed and returns the identity now in
/// effect. The group is changed first since giving up the user id may remove
/// the permission to change groups.
pub fn match_identity<S: IdentitySwitcher + ?Sized>(
    current: Identity,
    target: Identity,
    switcher: &S,
) -> Result<Identity, Error> {
    let switch_error = |source| Error::CredentialSwitch {
        uid: target.uid,
        gid: target.gid,
        source,
    };

    if current.gid != target.gid {
        debug!(target: LOG_TARGET, "switching egid {} -> {}", current.gid, target.gid);
        switcher
            .set_effective_gid(target.gid)
            .map_err(switch_error)?;
    }

    if current.uid != target.uid {
        debug!(target: LOG_TARGET, "switching euid {} -> {}", current.uid, target.uid);
        switcher
            .set_effective_uid(target.uid)
            .map_err(switch_error)?;
    }

    Ok(target)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    pub(crate) enum Call {
        Gid(gid_t),
        Uid(uid_t),
    }

    #[derive(Default)]
    pub(crate) struct RecordingSwitcher {
        pub identity: Identity,
        pub calls: RefCell<Vec<Call>>,
        pub deny_gid: bool,
        pub deny_uid: bool,
    }

    impl IdentitySwitcher for RecordingSwitcher {
        fn effective(&self) -> Identity {
            self.identity
        }

        fn set_effective_gid(&self, gid: gid_t) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Gid(gid));
            if self.deny_gid {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            Ok(())
        }

        fn set_effective_uid(&self, uid: uid_t) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Uid(uid));
            if self.deny_uid {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            Ok(())
        }
    }

    const ROOT: Identity = Identity { uid: 0, gid: 0 };
    const APP: Identity = Identity {
        uid: 1001,
        gid: 2001,
    };

    #[test]
    fn test_same_identity_does_not_switch() {
        let switcher = RecordingSwitcher::default();
        let result = match_identity(APP, APP, &switcher);
        assert!(matches!(result, Ok(identity) if identity == APP));
        assert!(switcher.calls.borrow().is_empty());
    }

    #[test]
    fn test_switches_gid_before_uid() {
        let switcher = RecordingSwitcher::default();
        let result = match_identity(ROOT, APP, &switcher);
        assert!(matches!(result, Ok(identity) if identity == APP));
        assert_eq!(
            *switcher.calls.borrow(),
            vec![Call::Gid(2001), Call::Uid(1001)]
        );
    }

    #[test]
    fn test_only_differing_id_is_switched() {
        let switcher = RecordingSwitcher::default();
        let target = Identity { uid: 0, gid: 2001 };
        assert!(match_identity(ROOT, target, &switcher).is_ok());
        assert_eq!(*switcher.calls.borrow(), vec![Call::Gid(2001)]);
    }

    #[test]
    fn test_gid_failure_stops_before_uid() {
        let switcher = RecordingSwitcher {
            deny_gid: true,
            ..Default::default()
        };
        let result = match_identity(ROOT, APP, &switcher);
        assert!(matches!(result, Err(Error::CredentialSwitch { .. })));
        assert_eq!(*switcher.calls.borrow(), vec![Call::Gid(2001)]);
    }

    #[test]
    fn test_uid_failure_is_fatal() {
        let switcher = RecordingSwitcher {
            deny_uid: true,
            ..Default::default()
        };
        let result = match_identity(ROOT, APP, &switcher);
        assert!(matches!(
            result,
            Err(Error::CredentialSwitch {
                uid: 1001,
                gid: 2001,
                ..
            })
        ));
    }
}
