// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Global Settings
//!
//! The persisted global configuration document. A JSON object recognising
//! `log_dir` (default `"logs"`), `hostname` and `port`; unknown keys are
//! preserved on load/save round trips only by the caller keeping the raw
//! document, not by this typed view.

use std::path::Path;

use serde::{Deserialize, Serialize};

use mailsift_domain::EngineError;

fn default_log_dir() -> String {
    "logs".to_string()
}

/// Typed view of the global configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory the engine writes its log files into.
    pub log_dir: String,
    /// Advertised hostname of the local control surface.
    pub hostname: Option<String>,
    /// Port of the local control surface (0–65535).
    pub port: Option<u16>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            hostname: None,
            port: None,
        }
    }
}

impl EngineSettings {
    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Saves settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.log_dir, "logs");
        assert!(settings.hostname.is_none());
        assert!(settings.port.is_none());
    }

    #[test]
    fn test_load_partial_document_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hostname": "localhost", "port": 8420}"#).unwrap();
        let settings = EngineSettings::load(&path).unwrap();
        assert_eq!(settings.log_dir, "logs");
        assert_eq!(settings.hostname.as_deref(), Some("localhost"));
        assert_eq!(settings.port, Some(8420));
    }

    #[test]
    fn test_port_range_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 70000}"#).unwrap();
        assert!(matches!(
            EngineSettings::load(&path),
            Err(EngineError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let settings = EngineSettings {
            log_dir: "/tmp/engine-logs".into(),
            hostname: Some("0.0.0.0".into()),
            port: Some(9000),
        };
        settings.save(&path).unwrap();
        assert_eq!(EngineSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        assert!(matches!(
            EngineSettings::load(Path::new("/nonexistent/config.json")),
            Err(EngineError::IoFailure(_))
        ));
    }
}
