// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error system for the email-corpus engine domain.
//! Errors are organised by where they surface and who is expected to react:
//!
//! - **Configuration errors** (`ConfigInvalid`) fail the owning stage and are
//!   surfaced to the caller with the offending JSON pointer.
//! - **Registry lookups** (`UnknownPlugin`, `UnknownAttributeType`,
//!   `MalformedAttribute`) are surfaced without any state change for the
//!   caller.
//! - **Per-file parser errors** (`EncodingUnknown`, `DecodeFailure`,
//!   `MalformedEmail`, `IoFailure`) are logged and the parser continues with
//!   the next file.
//! - **Composite failures** (`ChildFailed`) abort the owning executor and
//!   propagate upwards; the root reduces the tree outcome to a single
//!   success/failure for the outside world.
//!
//! ## Error Handling Strategy
//!
//! Leaves fail locally and set their own lifecycle state to `FAILED`;
//! composites aggregate and propagate. The state of every stage stays
//! queryable after a failure, and a failed subtree can be reset
//! (`FAILED → UNLOADED → LOADED`) and re-instantiated.

use thiserror::Error;

/// Domain-specific errors for the email-corpus processing engine.
///
/// Each variant carries a descriptive message naming the offending input
/// (file path, plugin name, attribute tag, JSON pointer) so failures are
/// actionable from the log alone.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Stage configuration failed JSON-Schema validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Registry lookup missed: no factory registered under this plugin name.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    /// Attribute deserialization hit an unregistered type tag.
    #[error("unknown attribute type: {0}")]
    UnknownAttributeType(String),

    /// Attribute payload could not be parsed by its registered factory.
    #[error("malformed attribute: {0}")]
    MalformedAttribute(String),

    /// Character-set detection produced no match for a file.
    #[error("could not detect encoding: {0}")]
    EncodingUnknown(String),

    /// Conversion of file bytes to UTF-8 failed.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// The parser flushed from a state that cannot produce an email.
    #[error("malformed email: {0}")]
    MalformedEmail(String),

    /// A child stage of a composite executor failed.
    #[error("child stage failed: {0}")]
    ChildFailed(String),

    /// File or directory access failed.
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the parser may keep going with the next file after this error.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            EngineError::EncodingUnknown(_)
                | EngineError::DecodeFailure(_)
                | EngineError::MalformedEmail(_)
                | EngineError::IoFailure(_)
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::IoFailure(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::ConfigInvalid(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_errors_do_not_abort_the_scan() {
        assert!(EngineError::EncodingUnknown("x.eml".into()).is_per_file());
        assert!(EngineError::IoFailure("denied".into()).is_per_file());
        assert!(!EngineError::ChildFailed("loader_0".into()).is_per_file());
        assert!(!EngineError::ConfigInvalid("/plugins".into()).is_per_file());
    }

    #[test]
    fn io_errors_convert() {
        let err: EngineError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, EngineError::IoFailure(_)));
    }
}
