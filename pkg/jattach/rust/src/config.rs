// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::warn;
use yaml_rust2::{Yaml, YamlLoader};

use crate::LOG_TARGET;
use crate::listener::{DEFAULT_ATTACH_ATTEMPTS, DEFAULT_ATTACH_INTERVAL, PollSchedule};

/// Settings that are not part of the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: log::Level,
    /// Overrides the temp directory detected from the target process.
    pub tmp_path: Option<PathBuf>,
    pub schedule: PollSchedule,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_yaml(&Ok(None))
    }
}

impl Config {
    /// Builds the configuration from a loaded YAML document and the
    /// environment, with environment variables taking precedence. A failed
    /// load leaves only the environment and defaults.
    ///
    /// Invalid values are logged, so the logger should be up by then.
    pub fn from_yaml(config: &Result<Option<Yaml>>) -> Self {
        let doc = config.as_ref().ok().and_then(|doc| doc.as_ref());
        Self {
            log_level: get_log_level(config),
            tmp_path: get_tmp_path(doc),
            schedule: PollSchedule {
                attempts: get_u64_setting(
                    doc,
                    "DD_JATTACH_ATTACH_ATTEMPTS",
                    "jattach.attach_attempts",
                )
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(DEFAULT_ATTACH_ATTEMPTS),
                interval: get_u64_setting(
                    doc,
                    "DD_JATTACH_ATTACH_INTERVAL_MS",
                    "jattach.attach_interval_ms",
                )
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_ATTACH_INTERVAL),
            },
        }
    }
}

/// Loads the YAML config file if one was given.
///
/// Nothing is logged here since this runs before the logger is set up; the
/// caller reports errors once it is.
pub fn load_config(config_path: Option<PathBuf>) -> Result<Option<Yaml>> {
    let Some(path) = config_path else {
        return Ok(None);
    };

    if !path.exists() {
        bail!(
            "Config file not found at {}. Checking environment variables only.",
            path.display()
        );
    }

    let mut file = File::open(&path).context("Failed to open jattach config file")?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .context("Failed to read jattach config file")?;

    let docs = YamlLoader::load_from_str(&contents).context("Failed to parse YAML config")?;
    Ok(docs.into_iter().next())
}

fn get_yaml_value<'a>(doc: &'a Yaml, key: &str) -> Option<&'a Yaml> {
    let mut current = doc;
    for part in key.split('.') {
        current = &current[part];
        if current.is_badvalue() {
            return None;
        }
    }
    Some(current)
}

/// Get string value from YAML, returning Option<String> instead of defaulting to empty string
fn get_yaml_string_option(doc: &Yaml, key: &str) -> Option<String> {
    get_yaml_value(doc, key)?.as_str().map(|s| s.to_string())
}

fn get_yaml_u64_option(doc: &Yaml, key: &str) -> Option<u64> {
    get_yaml_value(doc, key)?
        .as_i64()
        .and_then(|v| u64::try_from(v).ok())
}

/// Numeric setting from the environment, then YAML. Invalid values are
/// ignored with a warning.
fn get_u64_setting(doc: Option<&Yaml>, env_var: &str, yaml_option: &str) -> Option<u64> {
    if let Ok(val) = env::var(env_var) {
        match val.trim().parse() {
            Ok(v) => return Some(v),
            Err(_) => warn!(target: LOG_TARGET, "Ignoring invalid value for {env_var}: {val:?}"),
        }
    }

    let doc = doc?;
    let value = get_yaml_u64_option(doc, yaml_option);
    if value.is_none() && get_yaml_value(doc, yaml_option).is_some() {
        warn!(target: LOG_TARGET, "Ignoring invalid value for {yaml_option}");
    }
    value
}

fn get_tmp_path(doc: Option<&Yaml>) -> Option<PathBuf> {
    if let Ok(path) = env::var("DD_JATTACH_TMP_PATH")
        && !path.is_empty()
    {
        return Some(path.into());
    }

    doc.and_then(|doc| get_yaml_string_option(doc, "jattach.tmp_path"))
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Parse a Go log level string into a log::Level
/// Unknown levels silently default to Info
fn parse_log_level(level: &str) -> log::Level {
    match level.to_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "info" => log::Level::Info,
        "warn" | "warning" => log::Level::Warn,
        "error" | "critical" => log::Level::Error,
        "off" => log::Level::Error, // Rust log crate doesn't have "off", use Error as minimal logging
        _ => log::Level::Info,
    }
}

/// Gets the log level from configuration.
/// Priority: DD_LOG_LEVEL > LOG_LEVEL > YAML config > default Info
pub fn get_log_level(config: &Result<Option<Yaml>>) -> log::Level {
    if let Ok(level) = env::var("DD_LOG_LEVEL") {
        return parse_log_level(&level);
    }

    if let Ok(level) = env::var("LOG_LEVEL") {
        return parse_log_level(&level);
    }

    config
        .as_ref()
        .ok()
        .and_then(|opt| opt.as_ref())
        .and_then(|doc| get_yaml_string_option(doc, "log_level"))
        .map(|level| parse_log_level(&level))
        .unwrap_or(log::Level::Info)
}
