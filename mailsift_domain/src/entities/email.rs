// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Email Record
//!
//! The uniform in-memory representation every source file or database row is
//! normalised into. An email owns its headers, exactly one body variant, and
//! an attribute bag of typed enrichment values produced by stages.
//!
//! ## Identity
//!
//! Email identity is the 64-bit content hash computed by [`Email::finalize`]
//! over the raw bytes of the [`ATTR_FILE_BYTES`] attribute. Two records
//! compare equal exactly when their hashes are equal; the hash is stable and
//! deterministic so two runs over the same corpus make the same dedupe
//! decisions.
//!
//! ## Ownership
//!
//! An email exclusively owns its body and attribute values; clones are deep.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use crate::entities::email_body::EmailBody;
use crate::error::EngineError;
use crate::value_objects::AttributeValue;

/// Attribute key carrying the raw bytes of the source file.
pub const ATTR_FILE_BYTES: &str = "File bytes";
/// Attribute key carrying the source path of the file.
pub const ATTR_FILE_ID: &str = "File identifier";
/// Attribute key carrying the detected `(encoding, confidence)` pair.
pub const ATTR_ENCODING: &str = "Encoding";
/// Attribute key carrying ranked `(language, probability)` predictions.
pub const ATTR_LANGUAGE: &str = "Language predictions";

/// A normalised email: ordered headers, one body, and an attribute bag.
#[derive(Debug, Clone, Default)]
pub struct Email {
    headers: BTreeMap<String, String>,
    body: Option<EmailBody>,
    attributes: HashMap<String, AttributeValue>,
    is_multipart: bool,
    content_hash: u64,
}

impl Email {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a header field; later sets win.
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.insert(key.to_string(), value.to_string());
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header_keys(&self) -> Vec<String> {
        self.headers.keys().cloned().collect()
    }

    pub fn header_values(&self) -> Vec<String> {
        self.headers.values().cloned().collect()
    }

    pub fn set_body(&mut self, body: EmailBody) {
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<&EmailBody> {
        self.body.as_ref()
    }

    /// Inserts an attribute value under a unique key; later inserts overwrite.
    pub fn insert_attribute(&mut self, key: &str, value: AttributeValue) {
        self.attributes.insert(key.to_string(), value);
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attribute_keys(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    pub fn attribute_values(&self) -> Vec<&AttributeValue> {
        self.attributes.values().collect()
    }

    /// Declares whether the record carries a multipart body. Must agree with
    /// the body variant once the body is set.
    pub fn set_multipart(&mut self, multipart: bool) {
        self.is_multipart = multipart;
    }

    pub fn is_multipart(&self) -> bool {
        self.is_multipart
    }

    /// Computes the content hash from the raw file bytes.
    ///
    /// Called once the record is fully assembled; the hash is not recomputed
    /// afterwards. Fails if the [`ATTR_FILE_BYTES`] attribute is missing.
    pub fn finalize(&mut self) -> Result<(), EngineError> {
        let bytes = self
            .attributes
            .get(ATTR_FILE_BYTES)
            .ok_or_else(|| {
                EngineError::MalformedEmail(format!("missing {} attribute", ATTR_FILE_BYTES))
            })?
            .raw_bytes();
        self.content_hash = fxhash::hash64(&bytes);
        Ok(())
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Renders the record as the simple JSON shape used by external surfaces.
    pub fn to_json(&self) -> Value {
        let attributes: serde_json::Map<String, Value> = self
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.serialize())))
            .collect();
        json!({
            "unique_hash": self.content_hash,
            "is_multipart": self.is_multipart,
            "headers": self.headers,
            "body": self.body.as_ref().map(|b| b.all_data()),
            "attributes": attributes,
        })
    }
}

/// Equality is defined as equality of content hashes.
impl PartialEq for Email {
    fn eq(&self, other: &Self) -> bool {
        self.content_hash == other.content_hash
    }
}

impl Eq for Email {}
