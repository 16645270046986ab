// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Service
//!
//! Owns the email store and the root stage instance for one engine run and
//! wires them together: the workflow document configures the root, the root
//! builds the stage tree, and execution flows over a full view of the
//! store. The root reduces the run to a single success/failure while the
//! state of every subtree stays queryable through the tree dump.

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{error, info};

use mailsift_domain::{EmailStore, EngineError, StageState};

use crate::infrastructure::config::EngineSettings;
use crate::infrastructure::executors::root::RootExecutor;
use crate::infrastructure::runtime::registry::{registry, StageHandle};

/// Holds the store and the root of the execution tree.
pub struct EngineService {
    settings: EngineSettings,
    store: EmailStore,
    root: Mutex<Option<StageHandle>>,
}

impl EngineService {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            store: EmailStore::new(),
            root: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &EmailStore {
        &self.store
    }

    /// Creates the root instance configured with the workflow document.
    pub fn initialize_root(&self, workflow: &Value) -> Result<(), EngineError> {
        let mut root = self.root.lock();
        if root.is_none() {
            *root = Some(registry().create_instance(RootExecutor::PLUGIN_NAME, workflow)?);
        } else if let Some(handle) = root.as_ref() {
            handle.core().set_config(workflow.clone());
        }
        Ok(())
    }

    /// Tears the stage tree down, walking the root back to `LOADED`.
    pub fn clear_root(&self) {
        let root = self.root.lock();
        if let Some(handle) = root.as_ref() {
            if let Some(executor) = handle.stage().as_executor() {
                executor.clear_children();
            }
        }
    }

    /// Recursively instantiates the stage tree from the workflow.
    pub fn instantiate(&self) -> Result<(), EngineError> {
        let root = self.root.lock();
        let handle = root
            .as_ref()
            .ok_or_else(|| EngineError::Internal("root stage is not set".into()))?;
        handle.stage().instantiate_recursive()
    }

    /// Executes the whole tree over a full view of the store.
    pub fn execute(&self) -> Result<(), EngineError> {
        let stage = {
            let root = self.root.lock();
            root.as_ref()
                .ok_or_else(|| EngineError::Internal("root stage is not set".into()))?
                .clone_stage()
        };
        let mut view = self.store.full_view();
        let result = stage.execute(&mut view);
        view.commit();
        match &result {
            Ok(()) => info!("root execution completed successfully"),
            Err(execute_error) => error!("root execution failed: {}", execute_error),
        }
        result
    }

    pub fn root_state(&self) -> Option<StageState> {
        self.root.lock().as_ref().map(|handle| handle.core().state())
    }

    /// Recursive dump of the instance tree.
    pub fn tree_json(&self) -> Value {
        self.root
            .lock()
            .as_ref()
            .map(|handle| handle.stage().tree_json())
            .unwrap_or_else(|| json!({}))
    }
}
