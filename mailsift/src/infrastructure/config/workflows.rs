// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Library
//!
//! Manages the `workflows/` directory of persisted workflow documents. A
//! workflow is a JSON object matching the root stage's schema,
//! `{name: <outer executor>, options: <object>}`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use mailsift_domain::EngineError;

/// File-system service over a directory of workflow JSON documents.
pub struct WorkflowLibrary {
    dir: PathBuf,
}

impl WorkflowLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the `.json` workflow files in the library, sorted.
    pub fn list(&self) -> Result<Vec<String>, EngineError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolves a workflow reference: bare file names are looked up inside
    /// the library directory, paths with directory components are used
    /// as-is.
    pub fn resolve(&self, reference: &Path) -> PathBuf {
        if reference.components().count() > 1 {
            reference.to_path_buf()
        } else {
            self.dir.join(reference)
        }
    }

    /// Loads a workflow document.
    pub fn load(&self, reference: &Path) -> Result<Value, EngineError> {
        let contents = std::fs::read_to_string(self.resolve(reference))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes a workflow document, creating the library directory if
    /// needed.
    pub fn save(&self, name: &str, workflow: &Value) -> Result<(), EngineError> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(workflow)?;
        std::fs::write(self.dir.join(name), contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_list_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let library = WorkflowLibrary::new(dir.path().join("workflows"));
        let workflow = json!({"name": "Serial", "options": {"plugins": []}});
        library.save("default.json", &workflow).unwrap();
        library.save("other.json", &workflow).unwrap();

        assert_eq!(library.list().unwrap(), vec!["default.json", "other.json"]);
        let loaded = library.load(Path::new("default.json")).unwrap();
        assert_eq!(loaded, workflow);
    }

    #[test]
    fn test_resolve_keeps_explicit_paths() {
        let library = WorkflowLibrary::new("workflows");
        assert_eq!(
            library.resolve(Path::new("wf.json")),
            PathBuf::from("workflows/wf.json")
        );
        assert_eq!(
            library.resolve(Path::new("/abs/wf.json")),
            PathBuf::from("/abs/wf.json")
        );
    }

    #[test]
    fn test_malformed_document_is_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let library = WorkflowLibrary::new(dir.path());
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(matches!(
            library.load(Path::new("bad.json")),
            Err(EngineError::ConfigInvalid(_))
        ));
    }
}
