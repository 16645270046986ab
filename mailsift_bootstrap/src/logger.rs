// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logger Installation
//!
//! Installs the process-wide `tracing` subscriber once, before the
//! application layer starts. Verbosity comes from the CLI flags; an optional
//! log directory (from the global configuration) adds a plain-text log file
//! next to the console output.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Maps the CLI verbosity to a default `tracing` filter.
fn default_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the verbosity-derived filter. When `log_dir` is
/// given the directory is created and log lines are appended to
/// `mailsift.log` inside it; console output goes to stderr either way.
/// Returns an error if a subscriber is already installed or the log file
/// cannot be opened.
pub fn init(verbosity: Verbosity, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("mailsift.log"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|error| anyhow::anyhow!("failed to install logger: {}", error))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|error| anyhow::anyhow!("failed to install logger: {}", error))?;
        }
    }
    Ok(())
}
