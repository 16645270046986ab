// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Adder Stage
//!
//! Tags every email in the view with the configured text attributes.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{AttributeValue, EngineError, StageState, StoreView};

fn add_attr_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "attributes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "attributeKey": {
                            "type": "string",
                            "description": "The key for the attribute to be added."
                        },
                        "attributeVal": {
                            "type": "string",
                            "description": "The value for the attribute to be added."
                        }
                    },
                    "required": ["attributeKey", "attributeVal"],
                    "additionalProperties": false
                },
                "description": "A list of attributes to add to the attribute bag."
            }
        },
        "required": ["attributes"],
        "additionalProperties": false
    })
}

/// Adds configured text attributes to every email in the view.
pub struct AddAttrStage {
    core: StageCore,
}

impl AddAttrStage {
    pub const PLUGIN_NAME: &'static str = "AddAttr";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, add_attr_schema());
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for AddAttrStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("attribute adder execute called");
        self.core.transition_to(StageState::Running);
        let config = self.core.config();
        let attributes = config["attributes"].as_array().cloned().unwrap_or_default();

        view.for_each_mut(|email| {
            for attribute in &attributes {
                let key = attribute["attributeKey"].as_str().unwrap_or_default();
                let value = attribute["attributeVal"].as_str().unwrap_or_default();
                email.insert_attribute(key, AttributeValue::Text(value.to_string()));
            }
        });
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}
