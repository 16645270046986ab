// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parallel Executor
//!
//! Splits its view into `num_threads` contiguous partitions and runs every
//! child in turn over each partition, one OS thread per partition. The child
//! set is the same for every partition; per-partition mutable state lives in
//! the partition's view, and each task commits its partition's deferred
//! inserts when its run ends. The executor succeeds only if all tasks
//! succeed.
//!
//! The persisted workflow format names the child list `plugin` here (the
//! serial executor uses `plugins`); the asymmetry is preserved for file
//! compatibility, and `plugins` is accepted as an alias when `plugin` is
//! absent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::{error, info};

use mailsift_domain::services::{Executor, Stage, StageCore, IFACE_EXECUTOR, IFACE_STAGE};
use mailsift_domain::{EngineError, StageState, StoreView};

use crate::infrastructure::runtime::registry::{registry, StageHandle};

fn parallel_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "plugin": {
                "type": "array",
                "description": "List of stages to be executed by this executor.",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the stage to be executed."
                        },
                        "options": {
                            "type": "object",
                            "description": "Configuration options for this stage.",
                            "additionalProperties": true
                        }
                    },
                    "required": ["name", "options"],
                    "additionalProperties": false
                }
            },
            "num_threads": {
                "type": "integer",
                "description": "Number of threads to evenly distribute the input emails across."
            }
        },
        "required": ["num_threads"],
        "anyOf": [
            {"required": ["plugin"]},
            {"required": ["plugins"]}
        ],
        "additionalProperties": true
    })
}

/// Executor fanning an unordered child set out over view partitions.
pub struct ParallelExecutor {
    core: StageCore,
    children: Mutex<HashMap<String, StageHandle>>,
}

impl ParallelExecutor {
    pub const PLUGIN_NAME: &'static str = "Parallel";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::with_interfaces(
            Self::PLUGIN_NAME,
            instance_id,
            parallel_schema(),
            vec![IFACE_STAGE, IFACE_EXECUTOR],
        );
        core.transition_to(StageState::Loaded);
        Arc::new(Self {
            core,
            children: Mutex::new(HashMap::new()),
        })
    }

    fn children_snapshot(&self) -> Vec<(String, Arc<dyn Stage>)> {
        self.children
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone_stage()))
            .collect()
    }

    fn num_threads(&self) -> Result<usize, EngineError> {
        let config = self.core.config();
        let threads = config["num_threads"].as_u64().unwrap_or(0);
        if threads == 0 {
            return Err(EngineError::ConfigInvalid(
                "num_threads must be a positive integer".into(),
            ));
        }
        Ok(threads as usize)
    }
}

impl Stage for ParallelExecutor {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn instantiate_recursive(&self) -> Result<(), EngineError> {
        self.reload_children()?;
        for (child_id, child) in self.children_snapshot() {
            if let Err(error) = child.instantiate_recursive() {
                self.core.transition_to(StageState::Failed);
                return Err(EngineError::ChildFailed(format!("{}: {}", child_id, error)));
            }
        }
        self.core.transition_to(StageState::Ready);
        Ok(())
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("parallel executor execute called");
        self.core.transition_to(StageState::Running);
        let threads = match self.num_threads() {
            Ok(threads) => threads,
            Err(error) => {
                self.core.transition_to(StageState::Failed);
                return Err(error);
            }
        };
        let children = self.children_snapshot();
        let partitions = view.split(threads);

        let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool,
            Err(error) => {
                self.core.transition_to(StageState::Failed);
                return Err(EngineError::Internal(error.to_string()));
            }
        };
        let results: Vec<Result<(), EngineError>> = pool.install(|| {
            partitions
                .into_par_iter()
                .map(|mut partition| {
                    for (child_id, child) in &children {
                        if let Err(error) = child.execute(&mut partition) {
                            error!("child {} failed on partition: {}", child_id, error);
                            return Err(EngineError::ChildFailed(format!(
                                "{}: {}",
                                child_id, error
                            )));
                        }
                    }
                    partition.commit();
                    Ok(())
                })
                .collect()
        });

        match results.into_iter().find_map(Result::err) {
            None => {
                self.core.transition_to(StageState::Complete);
                Ok(())
            }
            Some(error) => {
                self.core.transition_to(StageState::Failed);
                Err(error)
            }
        }
    }

    fn as_executor(&self) -> Option<&dyn Executor> {
        Some(self)
    }

    fn tree_json(&self) -> Value {
        let children = self
            .children
            .lock()
            .values()
            .map(|handle| handle.stage().tree_json())
            .collect();
        self.core.tree_node(children)
    }
}

impl Executor for ParallelExecutor {
    fn reload_children(&self) -> Result<(), EngineError> {
        if let Err(error) = self.core.validate_config() {
            error!("schema invalid for {}: {}", self.core.plugin_name(), error);
            return Err(error);
        }

        let config = self.core.config();
        // Accept `plugins` as an alias for the persisted `plugin` field.
        let entries = config["plugin"]
            .as_array()
            .or_else(|| config["plugins"].as_array())
            .cloned()
            .unwrap_or_default();
        for entry in entries {
            let name = entry["name"].as_str().unwrap_or_default().to_string();
            let options = entry.get("options").cloned().unwrap_or_else(|| json!({}));
            match registry().create_instance(&name, &options) {
                Ok(handle) => {
                    self.children
                        .lock()
                        .insert(handle.instance_id().to_string(), handle);
                }
                Err(error) => {
                    error!("failed to load stage {}: {}", name, error);
                    self.core.transition_to(StageState::Failed);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// The partitioning already runs every child over every email, so
    /// executing one child degenerates to executing the set.
    fn execute_one(&self, view: &mut StoreView<'_>, _instance_id: &str) -> Result<(), EngineError> {
        info!("parallel executor execute_one called, delegating to execute");
        self.execute(view)
    }

    fn clear_children(&self) {
        let children = std::mem::take(&mut *self.children.lock());
        for handle in children.values() {
            if let Some(executor) = handle.stage().as_executor() {
                executor.clear_children();
            }
        }
    }

    fn child_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.children.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn child_by_id(&self, instance_id: &str) -> Option<Arc<dyn Stage>> {
        self.children
            .lock()
            .get(instance_id)
            .map(|handle| handle.clone_stage())
    }

    fn remove_child(&self, instance_id: &str) {
        self.children.lock().remove(instance_id);
    }
}
