// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Argument Parsing
//!
//! Command-line front end of the engine. The engine is an offline batch
//! tool: it loads a global configuration file and a workflow document,
//! builds the stage tree, runs it over the email store and reports the
//! outcome.

use std::path::PathBuf;

use clap::Parser;

/// How chatty the installed logger should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only.
    Normal,
    /// Informational messages (`-v`).
    Verbose,
    /// Full debug output (`-vv`).
    Debug,
}

/// Offline email-corpus processing engine
#[derive(Debug, Parser)]
#[command(name = "mailsift")]
#[command(about = "Mailsift - offline email-corpus processing engine")]
#[command(version)]
pub struct Cli {
    /// Global configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Workflow document to execute (JSON). Resolved against the workflows
    /// directory when the path has no directory component.
    #[arg(short, long)]
    pub workflow: PathBuf,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the recursive stage tree after the run
    #[arg(long)]
    pub dump_tree: bool,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::parse_from(["mailsift", "--workflow", "default.json"]);
        assert_eq!(cli.workflow, PathBuf::from("default.json"));
        assert_eq!(cli.verbosity(), Verbosity::Normal);
        assert!(cli.config.is_none());
        assert!(!cli.dump_tree);
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["mailsift", "-w", "wf.json", "-v"]);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
        let cli = Cli::parse_from(["mailsift", "-w", "wf.json", "-vv"]);
        assert_eq!(cli.verbosity(), Verbosity::Debug);
        let cli = Cli::parse_from(["mailsift", "-w", "wf.json", "-vvv"]);
        assert_eq!(cli.verbosity(), Verbosity::Debug);
    }

    #[test]
    fn test_config_and_dump_tree_flags() {
        let cli = Cli::parse_from(["mailsift", "-w", "wf.json", "-c", "cfg.json", "--dump-tree"]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        assert!(cli.dump_tree);
    }
}
