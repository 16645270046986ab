// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Logger Stage
//!
//! Logs each email's attribute bag at info level. Purely observational;
//! handy when debugging a workflow's enrichment steps.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{EngineError, StageState, StoreView};

fn attr_logger_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "logSerialized": {
                "type": "boolean",
                "description": "Log the serialized form instead of the human-readable rendering."
            }
        },
        "additionalProperties": false
    })
}

/// Logs the attribute bag of every email in the view.
pub struct AttrLoggerStage {
    core: StageCore,
}

impl AttrLoggerStage {
    pub const PLUGIN_NAME: &'static str = "AttrLogger";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, attr_logger_schema());
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for AttrLoggerStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        self.core.transition_to(StageState::Running);
        let serialized = self.core.config()["logSerialized"].as_bool().unwrap_or(false);

        view.for_each(|email| {
            for key in email.attribute_keys() {
                if let Some(value) = email.attribute(&key) {
                    if serialized {
                        info!("email {}: {} = {}", email.content_hash(), key, value.serialize());
                    } else {
                        info!("email {}: {} = {}", email.content_hash(), key, value);
                    }
                }
            }
        });
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}
