// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Root Executor
//!
//! The root of the execution tree. It owns exactly one child — typically an
//! outer executor such as [`super::SerialExecutor`], but any stage works —
//! instantiated from the workflow document `{name, options}`. The root
//! reduces the whole run to a single success/failure while every subtree's
//! state stays queryable.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{error, info};

use mailsift_domain::services::{Executor, Stage, StageCore, IFACE_EXECUTOR, IFACE_STAGE};
use mailsift_domain::{EngineError, StageState, StoreView};

use crate::infrastructure::runtime::registry::{registry, StageHandle};

fn root_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "The name of the outer executor (e.g. Serial), to be given the outermost options object.",
                "_inlook_check": {
                    "_StageRegistry": "executor"
                }
            },
            "options": {
                "type": "object",
                "description": "The configuration options provided to the outermost executor."
            }
        },
        "required": ["name", "options"],
        "additionalProperties": false
    })
}

/// Root of the execution tree; owns exactly one child.
pub struct RootExecutor {
    core: StageCore,
    child: Mutex<Option<StageHandle>>,
}

impl RootExecutor {
    pub const PLUGIN_NAME: &'static str = "Root";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::with_interfaces(
            Self::PLUGIN_NAME,
            instance_id,
            root_schema(),
            vec![IFACE_STAGE, IFACE_EXECUTOR],
        );
        Arc::new(Self {
            core,
            child: Mutex::new(None),
        })
    }

    fn child_stage(&self) -> Option<(String, Arc<dyn Stage>)> {
        self.child
            .lock()
            .as_ref()
            .map(|handle| (handle.instance_id().to_string(), handle.clone_stage()))
    }
}

impl Stage for RootExecutor {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn instantiate_recursive(&self) -> Result<(), EngineError> {
        self.reload_children()?;
        let child = self
            .child_stage()
            .ok_or_else(|| EngineError::ChildFailed("root has no child".into()))?;
        match child.1.instantiate_recursive() {
            Ok(()) => {
                self.core.transition_to(StageState::Ready);
                Ok(())
            }
            Err(error) => {
                self.core.transition_to(StageState::Failed);
                Err(EngineError::ChildFailed(format!("{}: {}", child.0, error)))
            }
        }
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("root executor execute called");
        self.core.transition_to(StageState::Running);
        let Some((child_id, stage)) = self.child_stage() else {
            self.core.transition_to(StageState::Failed);
            return Err(EngineError::ChildFailed("root has no child".into()));
        };
        let result = stage.execute(view);
        view.commit();
        match result {
            Ok(()) => {
                self.core.transition_to(StageState::Complete);
                Ok(())
            }
            Err(error) => {
                self.core.transition_to(StageState::Failed);
                Err(EngineError::ChildFailed(format!("{}: {}", child_id, error)))
            }
        }
    }

    fn as_executor(&self) -> Option<&dyn Executor> {
        Some(self)
    }

    fn tree_json(&self) -> Value {
        let children = self
            .child
            .lock()
            .as_ref()
            .map(|handle| vec![handle.stage().tree_json()])
            .unwrap_or_default();
        self.core.tree_node(children)
    }
}

impl Executor for RootExecutor {
    fn reload_children(&self) -> Result<(), EngineError> {
        if let Err(error) = self.core.validate_config() {
            error!("schema invalid for {}: {}", self.core.plugin_name(), error);
            return Err(error);
        }
        self.core.transition_to(StageState::Loaded);

        let config = self.core.config();
        let name = config["name"].as_str().unwrap_or_default().to_string();
        let options = config["options"].clone();
        match registry().create_instance(&name, &options) {
            Ok(handle) => {
                *self.child.lock() = Some(handle);
                Ok(())
            }
            Err(error) => {
                error!("failed to load stage {}: {}", name, error);
                self.core.transition_to(StageState::Failed);
                Err(error)
            }
        }
    }

    fn execute_one(&self, view: &mut StoreView<'_>, instance_id: &str) -> Result<(), EngineError> {
        info!("root executor execute_one called");
        let matches = self
            .child
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.instance_id() == instance_id);
        if matches {
            self.execute(view)
        } else {
            Ok(())
        }
    }

    fn clear_children(&self) {
        self.core.transition_to(StageState::Failed);
        self.core.transition_to(StageState::Unloaded);
        if let Some(handle) = self.child.lock().take() {
            if let Some(executor) = handle.stage().as_executor() {
                executor.clear_children();
            }
        }
        self.core.transition_to(StageState::Loaded);
    }

    fn child_ids(&self) -> Vec<String> {
        self.child
            .lock()
            .as_ref()
            .map(|handle| vec![handle.instance_id().to_string()])
            .unwrap_or_default()
    }

    fn child_by_id(&self, instance_id: &str) -> Option<Arc<dyn Stage>> {
        let child = self.child.lock();
        let handle = child.as_ref()?;
        (handle.instance_id() == instance_id).then(|| handle.clone_stage())
    }

    fn remove_child(&self, _instance_id: &str) {
        self.clear_children();
    }
}
