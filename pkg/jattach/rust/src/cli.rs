// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;
use phf::phf_set;
use thiserror::Error;

pub const USAGE: &str = "Usage: jattach <pid> <cmd> [args ...]";

pub const COMMAND_LIST: &str = "    load  threaddump   dumpheap  setflag    properties
    jcmd  inspectheap  datadump  printflag  agentProperties";

static VALID_COMMANDS: phf::Set<&'static str> = phf_set! {
    "load",
    "threaddump",
    "dumpheap",
    "setflag",
    "properties",
    "jcmd",
    "inspectheap",
    "datadump",
    "printflag",
    "agentProperties",
};

pub fn is_valid_command(command: &str) -> bool {
    VALID_COMMANDS.contains(command)
}

#[derive(Parser, Debug)]
#[command(name = "jattach", version)]
#[command(about = "Sends a command to a running JVM through the HotSpot attach mechanism", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Process ID of the JVM, as seen from this host
    #[arg(allow_negative_numbers = true)]
    pid: Option<String>,

    /// Command followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// A validated invocation.
#[derive(Debug, PartialEq, Eq)]
pub struct Request {
    pub config_path: Option<PathBuf>,
    pub pid: i32,
    /// The command followed by its arguments, as sent to the JVM.
    pub args: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{USAGE}\nCommands:\n{COMMAND_LIST}")]
    Usage,

    #[error("{0} is not a valid process ID")]
    InvalidPid(String),

    #[error("{0} is not a valid jattach command\nValid Commands:\n{COMMAND_LIST}")]
    InvalidCommand(String),

    /// `--help` and `--version`.
    #[error("{0}")]
    Display(clap::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Display(_) => 0,
            _ => 1,
        }
    }

    /// Whether the message belongs on stderr rather than stdout.
    pub fn is_stderr(&self) -> bool {
        matches!(self, CliError::InvalidPid(_))
    }
}

fn parse_pid(pid: &str) -> Result<i32, CliError> {
    match pid.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(CliError::InvalidPid(pid.to_string())),
    }
}

pub fn parse<I, T>(args: I) -> Result<Request, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Err(CliError::Display(e));
        }
        Err(_) => return Err(CliError::Usage),
    };

    let (Some(pid), Some(command)) = (args.pid, args.command.first()) else {
        return Err(CliError::Usage);
    };

    let pid = parse_pid(&pid)?;

    if !is_valid_command(command) {
        return Err(CliError::InvalidCommand(command.clone()));
    }

    Ok(Request {
        config_path: args.config,
        pid,
        args: args.command,
    })
}
