// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Contract
//!
//! A stage is one node of the execution tree. Every stage carries a
//! [`StageCore`] with its identity, JSON-Schema, configuration and lifecycle
//! state; composite stages additionally implement [`Executor`] and expose
//! child-management operations.
//!
//! The split mirrors the engine's two capabilities: `execute` over a view of
//! the email store (every stage), and orchestration of children (executors
//! only). Downcasting is replaced by the [`Stage::as_executor`] capability
//! probe, so dispatch stays at the stage boundary.
//!
//! ## Adapter contract
//!
//! Implementations declare their schema at construction, store configuration
//! verbatim on `set_config` (validation is a separate step), leave their
//! state as `COMPLETE` or `FAILED` when `execute` returns, never retain the
//! view beyond the call, and never touch the store except through the view.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::aggregates::StoreView;
use crate::entities::lifecycle::{StageState, StateMachine};
use crate::error::EngineError;

/// Interface tag every stage declares.
pub const IFACE_STAGE: &str = "stage";
/// Interface tag composite stages additionally declare.
pub const IFACE_EXECUTOR: &str = "executor";

/// Shared identity, configuration and lifecycle state of a stage.
pub struct StageCore {
    plugin_name: String,
    instance_id: String,
    schema: Value,
    config: RwLock<Value>,
    state: StateMachine,
    input_attributes: Vec<String>,
    generated_attributes: Vec<String>,
    interfaces: Vec<&'static str>,
}

impl StageCore {
    /// Creates the core of a leaf stage.
    pub fn new(plugin_name: &str, instance_id: &str, schema: Value) -> Self {
        Self::with_interfaces(plugin_name, instance_id, schema, vec![IFACE_STAGE])
    }

    /// Creates the core of a stage declaring extra interface tags.
    pub fn with_interfaces(
        plugin_name: &str,
        instance_id: &str,
        schema: Value,
        interfaces: Vec<&'static str>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            instance_id: instance_id.to_string(),
            schema,
            config: RwLock::new(Value::Null),
            state: StateMachine::default(),
            input_attributes: Vec::new(),
            generated_attributes: Vec::new(),
            interfaces,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Stores the configuration verbatim; `validate_config` is separate.
    pub fn set_config(&self, config: Value) {
        *self.config.write() = config;
    }

    pub fn config(&self) -> Value {
        self.config.read().clone()
    }

    pub fn state(&self) -> StageState {
        self.state.current()
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.state
    }

    /// Requests a lifecycle transition, auditable under this stage's name.
    #[track_caller]
    pub fn transition_to(&self, new_state: StageState) -> bool {
        self.state.transition_to(new_state, &self.plugin_name)
    }

    pub fn declare_input_attributes(&mut self, attributes: &[&str]) {
        self.input_attributes = attributes.iter().map(|a| a.to_string()).collect();
    }

    pub fn declare_generated_attributes(&mut self, attributes: &[&str]) {
        self.generated_attributes = attributes.iter().map(|a| a.to_string()).collect();
    }

    pub fn input_attributes(&self) -> &[String] {
        &self.input_attributes
    }

    pub fn generated_attributes(&self) -> &[String] {
        &self.generated_attributes
    }

    /// Generated plus input attributes, the set visible downstream.
    pub fn output_attributes(&self) -> Vec<String> {
        let mut combined = self.generated_attributes.clone();
        combined.extend(self.input_attributes.iter().cloned());
        combined
    }

    pub fn interfaces(&self) -> &[&'static str] {
        &self.interfaces
    }

    /// Validates the stored configuration against a cleaned copy of the
    /// schema.
    ///
    /// Cleaning strips every object key beginning with `_inlook_` — private
    /// UI hints that are not standard JSON-Schema vocabulary and must not
    /// reach the validator. Any failure transitions the stage to `FAILED`
    /// and names the offending JSON pointer.
    pub fn validate_config(&self) -> Result<(), EngineError> {
        let mut schema = self.schema.clone();
        clean_schema(&mut schema);

        let validator = match jsonschema::validator_for(&schema) {
            Ok(validator) => validator,
            Err(error) => {
                warn!("schema invalid for {}: {}", self.plugin_name, error);
                self.transition_to(StageState::Failed);
                return Err(EngineError::ConfigInvalid(format!(
                    "schema of {} is not valid JSON-Schema: {}",
                    self.plugin_name, error
                )));
            }
        };

        let config = self.config.read();
        let first_error = validator
            .iter_errors(&config)
            .next()
            .map(|error| (error.instance_path.to_string(), error.to_string()));
        drop(config);
        if let Some((pointer, message)) = first_error {
            error!(
                "schema validation error for {}: [{}] {}",
                self.plugin_name, pointer, message
            );
            self.transition_to(StageState::Failed);
            return Err(EngineError::ConfigInvalid(format!(
                "config of {} rejected at {}: {}",
                self.plugin_name, pointer, message
            )));
        }
        Ok(())
    }

    /// One node of the recursive instance-tree dump.
    pub fn tree_node(&self, children: Vec<Value>) -> Value {
        let create_func = if self.plugin_name.is_empty() {
            "Not Loaded".to_string()
        } else {
            self.plugin_name.clone()
        };
        let schema = if self.schema.is_null() {
            json!({})
        } else {
            self.schema.clone()
        };
        let config = self.config.read().clone();
        let config = if config.is_null() { json!({}) } else { config };
        json!({
            "instanceID": self.instance_id,
            "createFunc": create_func,
            "state": self.state().to_string(),
            "schema": schema,
            "config": config,
            "children": children,
        })
    }
}

/// Removes every object key whose name begins with `_inlook_`, recursing
/// through nested objects and arrays.
pub fn clean_schema(schema: &mut Value) {
    match schema {
        Value::Object(object) => {
            let keys_to_remove: Vec<String> = object
                .keys()
                .filter(|key| key.starts_with("_inlook_"))
                .cloned()
                .collect();
            for key in keys_to_remove {
                object.remove(&key);
            }
            for value in object.values_mut() {
                clean_schema(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                clean_schema(item);
            }
        }
        _ => {}
    }
}

/// A node in the execution tree.
///
/// Stages are shared behind `Arc` and may be driven from several threads by
/// a parallel parent, so all methods take `&self`; mutable state lives behind
/// the core's interior locks.
pub trait Stage: Send + Sync {
    /// The stage's shared identity and state.
    fn core(&self) -> &StageCore;

    /// Builds the subtree below this stage and transitions it to `READY`.
    ///
    /// Reaching `READY` requires a validated configuration. Leaves have no
    /// subtree; the default validates and moves straight to `READY`.
    fn instantiate_recursive(&self) -> Result<(), EngineError> {
        self.core().validate_config()?;
        self.core().transition_to(StageState::Ready);
        Ok(())
    }

    /// Runs the stage over a view of the email store.
    ///
    /// On return the stage is `COMPLETE`, or `FAILED` with partial work
    /// permitted; callers decide whether to retry the subtree.
    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError>;

    /// The executor capability, for stages that manage children.
    fn as_executor(&self) -> Option<&dyn Executor> {
        None
    }

    /// Recursive dump of the instance tree rooted at this stage.
    fn tree_json(&self) -> Value {
        self.core().tree_node(Vec::new())
    }
}

/// Child-management capability of composite stages (root, serial, parallel).
pub trait Executor: Stage {
    /// Validates configuration and (re)builds the child set from it.
    fn reload_children(&self) -> Result<(), EngineError>;

    /// Runs only the named child, subject to the executor's ordering rules.
    fn execute_one(&self, view: &mut StoreView<'_>, instance_id: &str) -> Result<(), EngineError>;

    /// Tears down all children and walks this stage back to `LOADED`.
    fn clear_children(&self);

    /// Instance ids of the managed children.
    fn child_ids(&self) -> Vec<String>;

    /// A managed child by instance id.
    fn child_by_id(&self, instance_id: &str) -> Option<Arc<dyn Stage>>;

    /// A managed child's lifecycle state.
    fn child_state(&self, instance_id: &str) -> Option<StageState> {
        self.child_by_id(instance_id).map(|child| child.core().state())
    }

    /// A managed child's configuration.
    fn child_config(&self, instance_id: &str) -> Option<Value> {
        self.child_by_id(instance_id).map(|child| child.core().config())
    }

    /// Replaces a managed child's configuration.
    fn update_child_config(&self, instance_id: &str, options: &Value) {
        if let Some(child) = self.child_by_id(instance_id) {
            child.core().set_config(options.clone());
        }
    }

    /// Drops a managed child.
    fn remove_child(&self, instance_id: &str);
}

/// Schema fragment shared by tests and simple stages: an object with no
/// accepted properties.
pub fn empty_object_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "additionalProperties": false
    })
}
