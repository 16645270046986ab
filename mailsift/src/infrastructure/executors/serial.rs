// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Serial Executor
//!
//! Runs its children one after another on the same view, committing the
//! view's deferred inserts between children so later children see what
//! earlier children published. Children are kept in insertion order; a
//! failing child aborts the run and fails the executor.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use mailsift_domain::services::{Executor, Stage, StageCore, IFACE_EXECUTOR, IFACE_STAGE};
use mailsift_domain::{EngineError, StageState, StoreView};

use crate::infrastructure::runtime::registry::{registry, StageHandle};

fn serial_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "plugins": {
                "type": "array",
                "description": "List of stages to be executed by this executor, in order.",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the stage to be executed.",
                            "_inlook_check": {
                                "_StageRegistry": "stage"
                            }
                        },
                        "options": {
                            "type": "object",
                            "description": "Configuration options for this stage.",
                            "additionalProperties": true
                        }
                    },
                    "required": ["name"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["plugins"],
        "additionalProperties": true
    })
}

/// Executor running an insertion-ordered child set serially.
pub struct SerialExecutor {
    core: StageCore,
    children: Mutex<IndexMap<String, StageHandle>>,
}

impl SerialExecutor {
    pub const PLUGIN_NAME: &'static str = "Serial";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::with_interfaces(
            Self::PLUGIN_NAME,
            instance_id,
            serial_schema(),
            vec![IFACE_STAGE, IFACE_EXECUTOR],
        );
        core.transition_to(StageState::Loaded);
        // execute_one leaves the executor re-armable after running one child
        core.state_machine().add_transition(StageState::Running, StageState::Ready);
        Arc::new(Self {
            core,
            children: Mutex::new(IndexMap::new()),
        })
    }

    /// Snapshot of the children in insertion order.
    fn children_in_order(&self) -> Vec<(String, Arc<dyn Stage>)> {
        self.children
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone_stage()))
            .collect()
    }
}

impl Stage for SerialExecutor {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn instantiate_recursive(&self) -> Result<(), EngineError> {
        self.reload_children()?;
        for (child_id, child) in self.children_in_order() {
            if let Err(error) = child.instantiate_recursive() {
                self.core.transition_to(StageState::Failed);
                return Err(EngineError::ChildFailed(format!("{}: {}", child_id, error)));
            }
        }
        self.core.transition_to(StageState::Ready);
        Ok(())
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("serial executor execute called");
        let children = self.children_in_order();
        if children.is_empty() {
            error!("serial executor has no children loaded");
            self.core.transition_to(StageState::Failed);
            return Err(EngineError::ChildFailed("no children loaded".into()));
        }

        self.core.transition_to(StageState::Running);
        for (child_id, child) in children {
            if let Err(error) = child.execute(view) {
                self.core.transition_to(StageState::Failed);
                return Err(EngineError::ChildFailed(format!("{}: {}", child_id, error)));
            }
            view.commit();
        }
        self.core.transition_to(StageState::Complete);
        Ok(())
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

impl Executor for SerialExecutor {
    fn reload_children(&self) -> Result<(), EngineError> {
        if let Err(error) = self.core.validate_config() {
            error!("schema invalid for {}: {}", self.core.plugin_name(), error);
            return Err(error);
        }

        let config = self.core.config();
        let entries = config["plugins"].as_array().cloned().unwrap_or_default();
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

    fn execute_one(&self, view: &mut StoreView<'_>, instance_id: &str) -> Result<(), EngineError> {
        info!("serial executor execute_one called");
        let children = self.children_in_order();
        if children.is_empty() {
            error!("serial executor has no children loaded");
            return Err(EngineError::ChildFailed("no children loaded".into()));
        }

        for (child_id, child) in children {
            if child_id == instance_id {
                debug!("executing {} as all prior children are COMPLETE", child_id);
                self.core.transition_to(StageState::Running);
                let result = child.execute(view);
                view.commit();
                return match result {
                    Ok(()) => {
                        self.core.transition_to(StageState::Ready);
                        Ok(())
                    }
                    Err(error) => {
                        self.core.transition_to(StageState::Failed);
                        Err(EngineError::ChildFailed(format!("{}: {}", child_id, error)))
                    }
                };
            }
            if child.core().state() != StageState::Complete {
                debug!(
                    "prior child {} is not COMPLETE before {}, refusing",
                    child_id, instance_id
                );
                self.core.transition_to(StageState::Ready);
                return Ok(());
            }
        }
        self.core.transition_to(StageState::Ready);
        Ok(())
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
        self.children.lock().keys().cloned().collect()
    }

    fn child_by_id(&self, instance_id: &str) -> Option<Arc<dyn Stage>> {
        self.children
            .lock()
            .get(instance_id)
            .map(|handle| handle.clone_stage())
    }

    fn remove_child(&self, instance_id: &str) {
        self.children.lock().shift_remove(instance_id);
    }
}
