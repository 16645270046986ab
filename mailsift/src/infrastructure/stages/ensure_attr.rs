// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Checker Stage
//!
//! Verifies that every email in the view carries a given attribute with a
//! given rendered value, failing the stage otherwise. Useful as a guard
//! between pipeline steps and in workflow smoke tests.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{EngineError, StageState, StoreView};

fn ensure_attr_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "key": {
                "type": "string",
                "description": "The attribute key every email must carry."
            },
            "val": {
                "type": "string",
                "description": "The rendered value the attribute must have."
            }
        },
        "required": ["key", "val"],
        "additionalProperties": false
    })
}

/// Fails unless every email carries the expected attribute value.
pub struct EnsureAttrStage {
    core: StageCore,
}

impl EnsureAttrStage {
    pub const PLUGIN_NAME: &'static str = "EnsureAttr";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, ensure_attr_schema());
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for EnsureAttrStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("attribute checker execute called");
        self.core.transition_to(StageState::Running);
        let config = self.core.config();
        let key = config["key"].as_str().unwrap_or_default().to_string();
        let expected = config["val"].as_str().unwrap_or_default().to_string();

        let mut missing = 0usize;
        view.for_each(|email| {
            let matches = email
                .attribute(&key)
                .is_some_and(|value| value.to_string() == expected);
            if !matches {
                missing += 1;
            }
        });

        if missing > 0 {
            warn!("{} emails are missing attribute {}={}", missing, key, expected);
            self.core.transition_to(StageState::Failed);
            return Err(EngineError::Internal(format!(
                "{} emails are missing attribute {}={}",
                missing, key, expected
            )));
        }
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}
