// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mailsift CLI Application
//!
//! Entry point of the offline engine. Parses arguments, installs the
//! logger, loads the global configuration and the requested workflow
//! document, runs the stage tree over the email store and maps the outcome
//! to a Unix exit code.
//!
//! ```bash
//! # Run a workflow from the workflows/ library
//! mailsift --workflow default.json
//!
//! # Explicit config, verbose logging, tree dump after the run
//! mailsift -c mailsift.json -w crunch.json -v --dump-tree
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use mailsift::infrastructure::config::{EngineSettings, WorkflowLibrary};
use mailsift::run_workflow;
use mailsift_bootstrap::cli::Cli;
use mailsift_bootstrap::exit_code::ExitCode;
use mailsift_bootstrap::logger;

fn run(cli: &Cli) -> Result<bool> {
    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };
    if let Err(logger_error) = logger::init(cli.verbosity(), Some(Path::new(&settings.log_dir))) {
        eprintln!("could not install logger: {}", logger_error);
    }
    info!("program started");

    let library = WorkflowLibrary::new("workflows");
    let workflow = library.load(&cli.workflow)?;

    let outcome = run_workflow(settings, workflow)?;
    if outcome.success {
        info!("workflow completed over {} emails", outcome.emails);
    } else {
        error!("workflow failed; stage states remain queryable in the tree dump");
    }
    if cli.dump_tree {
        println!("{}", serde_json::to_string_pretty(&outcome.tree)?);
    }
    Ok(outcome.success)
}

fn main() {
    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(true) => ExitCode::Success,
        Ok(false) => ExitCode::Error,
        Err(run_error) => {
            eprintln!("mailsift: {:#}", run_error);
            ExitCode::from_error(run_error.as_ref())
        }
    };
    std::process::exit(code.as_i32());
}
