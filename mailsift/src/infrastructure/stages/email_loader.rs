// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Email Loader Stage
//!
//! Drives the streaming parser over a file or directory tree and stages the
//! resulting emails into the execute view. Duplicate files (by content hash)
//! are skipped, so repeated runs over the same corpus leave the store
//! unchanged.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{
    EngineError, StageState, StoreView, ATTR_ENCODING, ATTR_FILE_BYTES, ATTR_FILE_ID, ATTR_LANGUAGE,
};

use crate::infrastructure::parser::EmailParser;

fn loader_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "emailPath": {
                "type": "string",
                "description": "Path to an email file or a directory. If a directory, it will be traversed recursively."
            }
        },
        "required": ["emailPath"],
        "additionalProperties": false
    })
}

/// Parser stage: normalises raw email files into the store.
pub struct EmailLoaderStage {
    core: StageCore,
}

impl EmailLoaderStage {
    pub const PLUGIN_NAME: &'static str = "EmailLoader";

    pub fn create(instance_id: &str) -> Arc<dyn Stage> {
        let mut core = StageCore::new(Self::PLUGIN_NAME, instance_id, loader_schema());
        core.declare_generated_attributes(&[ATTR_FILE_ID, ATTR_FILE_BYTES, ATTR_ENCODING, ATTR_LANGUAGE]);
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for EmailLoaderStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        info!("email loader execute called");
        self.core.transition_to(StageState::Running);
        let path = PathBuf::from(self.core.config()["emailPath"].as_str().unwrap_or_default());

        let mut parser = EmailParser::new(view);
        if let Err(parse_error) = parser.parse(&path) {
            error!("email loader failed: {}", parse_error);
            self.core.transition_to(StageState::Failed);
            return Err(parse_error);
        }
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}
