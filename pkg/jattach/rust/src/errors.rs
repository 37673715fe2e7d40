// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::io;

use thiserror::Error;

/// Exit code reported for every failure that happens before a complete
/// exchange with the JVM.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// The step of an attach that failed, used as log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locate,
    Credentials,
    Listener,
    Connect,
    Request,
    Response,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Locate => "locate",
            Stage::Credentials => "credentials",
            Stage::Listener => "listener",
            Stage::Connect => "connect",
            Stage::Request => "request",
            Stage::Response => "response",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("process not found")]
    ProcessNotFound(#[source] io::Error),

    #[error("failed to change credentials to match the target process (uid={uid}, gid={gid})")]
    CredentialSwitch {
        uid: u32,
        gid: u32,
        #[source]
        source: io::Error,
    },

    #[error("could not start the attach mechanism: {context}")]
    ListenerStart { context: String },

    #[error("could not connect to JVM socket")]
    Connect(#[source] io::Error),

    #[error("error writing to the JVM socket")]
    Write(#[source] io::Error),

    #[error("error reading response from JVM")]
    Read(#[source] io::Error),

    #[error("unexpected EOF while reading response from the JVM")]
    UnexpectedEof,
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::ProcessNotFound(_) => Stage::Locate,
            Error::CredentialSwitch { .. } => Stage::Credentials,
            Error::ListenerStart { .. } => Stage::Listener,
            Error::Connect(_) => Stage::Connect,
            Error::Write(_) => Stage::Request,
            Error::Read(_) | Error::UnexpectedEof => Stage::Response,
        }
    }

    pub fn exit_code(&self) -> i32 {
        FAILURE_EXIT_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_exits_with_one() {
        let errors = [
            Error::ProcessNotFound(io::Error::from(io::ErrorKind::NotFound)),
            Error::CredentialSwitch {
                uid: 1000,
                gid: 1000,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
            Error::ListenerStart {
                context: "timeout".to_string(),
            },
            Error::Connect(io::Error::from(io::ErrorKind::ConnectionRefused)),
            Error::Write(io::Error::from(io::ErrorKind::BrokenPipe)),
            Error::Read(io::Error::from(io::ErrorKind::ConnectionReset)),
            Error::UnexpectedEof,
        ];

        for error in errors {
            assert_eq!(error.exit_code(), 1, "{error}");
        }
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Error::UnexpectedEof.stage().to_string(), "response");
        assert_eq!(
            Error::Write(io::Error::from(io::ErrorKind::BrokenPipe))
                .stage()
                .to_string(),
            "request"
        );
        assert_eq!(
            Error::ListenerStart {
                context: String::new()
            }
            .stage(),
            Stage::Listener
        );
    }
}
