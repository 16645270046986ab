// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Workflow Use Case
//!
//! One offline engine run: register the stages, build the tree from the
//! workflow document, execute it over the store, and report the outcome.
//!
//! Configuration errors (an unknown executor name, a config rejected by its
//! schema) surface as errors; a failed execution is a reported outcome, not
//! an error, and the final stage tree stays inspectable either way.

use serde_json::Value;

use mailsift_domain::EngineError;

use crate::application::services::EngineService;
use crate::infrastructure::config::EngineSettings;
use crate::infrastructure::runtime::registry::{register_builtin_stages, registry};

/// Result of one engine run.
#[derive(Debug)]
pub struct RunWorkflowOutcome {
    /// The single success/failure the root reduces the run to.
    pub success: bool,
    /// Committed store size after the run.
    pub emails: usize,
    /// Recursive stage tree dump after the run.
    pub tree: Value,
}

/// Runs a workflow document over a fresh store.
pub fn run_workflow(
    settings: EngineSettings,
    workflow: Value,
) -> Result<RunWorkflowOutcome, EngineError> {
    register_builtin_stages();
    registry().load_all()?;

    let service = EngineService::new(settings);
    service.initialize_root(&workflow)?;
    service.instantiate()?;
    let success = service.execute().is_ok();
    Ok(RunWorkflowOutcome {
        success,
        emails: service.store().len(),
        tree: service.tree_json(),
    })
}
