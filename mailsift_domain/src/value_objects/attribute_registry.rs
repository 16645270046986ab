// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Type Registry
//!
//! Process-wide registry mapping serialized-form type tags to factory
//! functions that parse a payload back into an [`AttributeValue`]. The
//! registry is populated with the built-in variants once, on first use, and
//! rejects re-registration of a tag.
//!
//! Deserialization splits the serialized text on the first `:`, resolves the
//! tag, and hands the remainder to the factory:
//!
//! ```
//! use mailsift_domain::value_objects::{attribute_registry, AttributeValue};
//!
//! let value = attribute_registry()
//!     .deserialize("AttributeBagInteger:42")
//!     .unwrap();
//! assert_eq!(value, AttributeValue::Integer(42));
//! ```

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::EngineError;
use crate::value_objects::attribute_value::{
    AttributeValue, TAG_BINARY, TAG_BOOLEAN, TAG_CHAR_VECTOR, TAG_DOUBLE, TAG_INTEGER, TAG_STRING,
    TAG_STRING_FLOAT_PAIR_VECTOR, TAG_STRING_INT_PAIR,
};

/// Parses a serialized payload into a value.
pub type AttributeFactory = fn(&str) -> Result<AttributeValue, EngineError>;

/// Process-wide tag-to-factory registry for attribute deserialization.
pub struct AttributeRegistry {
    factories: RwLock<HashMap<String, AttributeFactory>>,
}

static REGISTRY: Lazy<AttributeRegistry> = Lazy::new(|| {
    let registry = AttributeRegistry {
        factories: RwLock::new(HashMap::new()),
    };
    registry.register_builtins();
    registry
});

/// Returns the process-wide attribute registry, initialising it on first use.
pub fn attribute_registry() -> &'static AttributeRegistry {
    &REGISTRY
}

impl AttributeRegistry {
    /// Binds a type tag to a payload factory.
    ///
    /// Returns `MalformedAttribute` if the tag is already registered;
    /// registration happens once per variant at program start.
    pub fn register(&self, tag: &str, factory: AttributeFactory) -> Result<(), EngineError> {
        let mut factories = self.factories.write();
        if factories.contains_key(tag) {
            return Err(EngineError::MalformedAttribute(format!(
                "attribute type {} is already registered",
                tag
            )));
        }
        factories.insert(tag.to_string(), factory);
        Ok(())
    }

    /// Parses a `<type-tag>:<payload>` serialized form.
    pub fn deserialize(&self, serialized: &str) -> Result<AttributeValue, EngineError> {
        let (tag, payload) = serialized.split_once(':').ok_or_else(|| {
            EngineError::MalformedAttribute(format!("missing ':' delimiter in {:?}", serialized))
        })?;
        let factory = {
            let factories = self.factories.read();
            factories
                .get(tag)
                .copied()
                .ok_or_else(|| EngineError::UnknownAttributeType(tag.to_string()))?
        };
        factory(payload)
    }

    /// Registered tags, for introspection.
    pub fn registered_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.read().keys().cloned().collect();
        tags.sort();
        tags
    }

    fn register_builtins(&self) {
        let builtins: [(&str, AttributeFactory); 8] = [
            (TAG_STRING, parse_text),
            (TAG_BOOLEAN, parse_boolean),
            (TAG_INTEGER, parse_integer),
            (TAG_DOUBLE, parse_double),
            (TAG_BINARY, parse_binary),
            (TAG_CHAR_VECTOR, parse_char_vector),
            (TAG_STRING_INT_PAIR, parse_string_int_pair),
            (TAG_STRING_FLOAT_PAIR_VECTOR, parse_string_float_pair_vector),
        ];
        let mut factories = self.factories.write();
        for (tag, factory) in builtins {
            factories.insert(tag.to_string(), factory);
        }
    }
}

fn parse_text(payload: &str) -> Result<AttributeValue, EngineError> {
    Ok(AttributeValue::Text(payload.to_string()))
}

fn parse_boolean(payload: &str) -> Result<AttributeValue, EngineError> {
    Ok(AttributeValue::Boolean(payload == "1"))
}

fn parse_integer(payload: &str) -> Result<AttributeValue, EngineError> {
    payload
        .parse::<i64>()
        .map(AttributeValue::Integer)
        .map_err(|_| EngineError::MalformedAttribute(format!("invalid integer payload {:?}", payload)))
}

fn parse_double(payload: &str) -> Result<AttributeValue, EngineError> {
    payload
        .parse::<f64>()
        .map(AttributeValue::Double)
        .map_err(|_| EngineError::MalformedAttribute(format!("invalid double payload {:?}", payload)))
}

fn parse_binary(payload: &str) -> Result<AttributeValue, EngineError> {
    BASE64
        .decode(payload)
        .map(AttributeValue::Binary)
        .map_err(|_| EngineError::MalformedAttribute(format!("invalid base64 payload {:?}", payload)))
}

fn parse_char_vector(payload: &str) -> Result<AttributeValue, EngineError> {
    BASE64
        .decode(payload)
        .map(AttributeValue::CharVector)
        .map_err(|_| EngineError::MalformedAttribute(format!("invalid base64 payload {:?}", payload)))
}

fn parse_string_int_pair(payload: &str) -> Result<AttributeValue, EngineError> {
    // The text half may contain colons; the integer half cannot, so split on
    // the last one.
    let (text, number) = payload.rsplit_once(':').ok_or_else(|| {
        EngineError::MalformedAttribute(format!("invalid pair payload {:?}", payload))
    })?;
    let number = number.parse::<i64>().map_err(|_| {
        EngineError::MalformedAttribute(format!("invalid pair integer in {:?}", payload))
    })?;
    Ok(AttributeValue::StringIntPair(text.to_string(), number))
}

fn parse_string_float_pair_vector(payload: &str) -> Result<AttributeValue, EngineError> {
    let mut pairs = Vec::new();
    for segment in payload.split(';') {
        if segment.is_empty() {
            continue;
        }
        let (text, probability) = segment.rsplit_once(':').ok_or_else(|| {
            EngineError::MalformedAttribute(format!("invalid vector pair {:?}", segment))
        })?;
        let probability = probability.parse::<f32>().map_err(|_| {
            EngineError::MalformedAttribute(format!("invalid vector float in {:?}", segment))
        })?;
        pairs.push((text.to_string(), probability));
    }
    Ok(AttributeValue::StringFloatPairVector(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = attribute_registry().deserialize("NoSuchTag:payload");
        assert!(matches!(err, Err(EngineError::UnknownAttributeType(tag)) if tag == "NoSuchTag"));
    }

    #[test]
    fn test_missing_delimiter_is_rejected() {
        let err = attribute_registry().deserialize("AttributeBagString");
        assert!(matches!(err, Err(EngineError::MalformedAttribute(_))));
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let err = attribute_registry().deserialize("AttributeBagInteger:not-a-number");
        assert!(matches!(err, Err(EngineError::MalformedAttribute(_))));

        let err = attribute_registry().deserialize("AttributeBagStringIntPair:no-separator");
        assert!(matches!(err, Err(EngineError::MalformedAttribute(_))));

        let err = attribute_registry().deserialize("AttributeBagBinary:not base64!");
        assert!(matches!(err, Err(EngineError::MalformedAttribute(_))));
    }

    #[test]
    fn test_reregistration_is_rejected() {
        let err = attribute_registry().register(super::TAG_STRING, parse_text);
        assert!(err.is_err());
    }

    #[test]
    fn test_builtin_tags_are_present() {
        let tags = attribute_registry().registered_tags();
        assert!(tags.iter().any(|t| t == "AttributeBagString"));
        assert!(tags.iter().any(|t| t == "AttributeBagCharVector"));
        assert_eq!(tags.len(), 8);
    }
}
