// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Values
//!
//! Typed, self-describing enrichment values carried in an email's attribute
//! bag. Every value renders to human-readable text and serializes to the
//! persisted form `<type-tag>:<payload>`, where the tag uniquely identifies
//! the variant and the payload is parseable back into an equal value.
//!
//! ## Serialized Form
//!
//! | Variant                | Tag                                | Payload                      |
//! |------------------------|------------------------------------|------------------------------|
//! | Text                   | `AttributeBagString`               | the text                     |
//! | Boolean                | `AttributeBagBoolean`              | `0` / `1`                    |
//! | Integer                | `AttributeBagInteger`              | decimal                      |
//! | Double                 | `AttributeBagDouble`               | decimal                      |
//! | Binary                 | `AttributeBagBinary`               | base64 of the bytes          |
//! | CharVector             | `AttributeBagCharVector`           | base64 of the bytes          |
//! | StringIntPair          | `AttributeBagStringIntPair`        | `text:int`                   |
//! | StringFloatPairVector  | `AttributeBagStringFloatPairVector`| `text:float;` per pair       |
//!
//! Numeric payloads are locale-independent decimal. Byte-carrying variants
//! serialize as base64 so arbitrary bytes (a latin-1 source file, say)
//! survive the text form byte for byte; their human-readable rendering stays
//! a lossy string. Pairs split on the *last* `:` of their segment so the
//! text half may itself contain colons; vector entries are separated by `;`.
//!
//! The round-trip invariant `deserialize(serialize(v)) == v` holds for every
//! variant and is exercised by property tests below.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Serialized-form type tags, one per variant.
pub const TAG_STRING: &str = "AttributeBagString";
pub const TAG_BOOLEAN: &str = "AttributeBagBoolean";
pub const TAG_INTEGER: &str = "AttributeBagInteger";
pub const TAG_DOUBLE: &str = "AttributeBagDouble";
pub const TAG_BINARY: &str = "AttributeBagBinary";
pub const TAG_CHAR_VECTOR: &str = "AttributeBagCharVector";
pub const TAG_STRING_INT_PAIR: &str = "AttributeBagStringIntPair";
pub const TAG_STRING_FLOAT_PAIR_VECTOR: &str = "AttributeBagStringFloatPairVector";

/// A polymorphic attribute value with a closed variant set.
///
/// Values are deep-copied on clone; an email exclusively owns the values in
/// its attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Plain text.
    Text(String),
    /// Boolean flag, serialized as `0`/`1`.
    Boolean(bool),
    /// Signed integer.
    Integer(i64),
    /// Double-precision float.
    Double(f64),
    /// Opaque byte sequence.
    Binary(Vec<u8>),
    /// Raw character data, e.g. the undecoded bytes of a source file.
    CharVector(Vec<u8>),
    /// A (text, integer) pair, e.g. a detected encoding and its confidence.
    StringIntPair(String, i64),
    /// An ordered sequence of (text, float) pairs, e.g. ranked language
    /// predictions with probabilities.
    StringFloatPairVector(Vec<(String, f32)>),
}

impl AttributeValue {
    /// The serialized-form tag identifying this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttributeValue::Text(_) => TAG_STRING,
            AttributeValue::Boolean(_) => TAG_BOOLEAN,
            AttributeValue::Integer(_) => TAG_INTEGER,
            AttributeValue::Double(_) => TAG_DOUBLE,
            AttributeValue::Binary(_) => TAG_BINARY,
            AttributeValue::CharVector(_) => TAG_CHAR_VECTOR,
            AttributeValue::StringIntPair(_, _) => TAG_STRING_INT_PAIR,
            AttributeValue::StringFloatPairVector(_) => TAG_STRING_FLOAT_PAIR_VECTOR,
        }
    }

    /// Serializes to the persisted `<type-tag>:<payload>` form.
    pub fn serialize(&self) -> String {
        format!("{}:{}", self.type_tag(), self.payload())
    }

    /// The variant-specific payload of the serialized form.
    fn payload(&self) -> String {
        match self {
            AttributeValue::Text(value) => value.clone(),
            AttributeValue::Boolean(value) => if *value { "1" } else { "0" }.to_string(),
            AttributeValue::Integer(value) => value.to_string(),
            AttributeValue::Double(value) => value.to_string(),
            AttributeValue::Binary(bytes) => BASE64.encode(bytes),
            AttributeValue::CharVector(bytes) => BASE64.encode(bytes),
            AttributeValue::StringIntPair(text, number) => format!("{}:{}", text, number),
            AttributeValue::StringFloatPairVector(pairs) => {
                let mut payload = String::new();
                for (text, probability) in pairs {
                    payload.push_str(text);
                    payload.push(':');
                    payload.push_str(&probability.to_string());
                    payload.push(';');
                }
                payload
            }
        }
    }

    /// The raw bytes backing this value, used for content hashing.
    ///
    /// Byte-carrying variants expose their bytes directly; all other
    /// variants hash their text rendering.
    pub fn raw_bytes(&self) -> Vec<u8> {
        match self {
            AttributeValue::Binary(bytes) | AttributeValue::CharVector(bytes) => bytes.clone(),
            AttributeValue::Text(value) => value.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for AttributeValue {
    /// The human-readable rendering of the value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(value) => write!(f, "{}", value),
            AttributeValue::Boolean(value) => write!(f, "{}", if *value { "1" } else { "0" }),
            AttributeValue::Integer(value) => write!(f, "{}", value),
            AttributeValue::Double(value) => write!(f, "{}", value),
            AttributeValue::Binary(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            AttributeValue::CharVector(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            AttributeValue::StringIntPair(text, number) => write!(f, "({}, {})", text, number),
            AttributeValue::StringFloatPairVector(pairs) => {
                for (text, probability) in pairs {
                    write!(f, "({}, {});", text, probability)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::attribute_registry::attribute_registry;
    use proptest::prelude::*;

    fn roundtrip(value: AttributeValue) -> AttributeValue {
        attribute_registry()
            .deserialize(&value.serialize())
            .expect("round-trip should parse")
    }

    #[test]
    fn test_serialized_form_is_tag_colon_payload() {
        let value = AttributeValue::Text("hello".into());
        assert_eq!(value.serialize(), "AttributeBagString:hello");

        let value = AttributeValue::Boolean(true);
        assert_eq!(value.serialize(), "AttributeBagBoolean:1");

        let value = AttributeValue::StringIntPair("US-ASCII".into(), 93);
        assert_eq!(value.serialize(), "AttributeBagStringIntPair:US-ASCII:93");
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let samples = vec![
            AttributeValue::Text("plain text".into()),
            AttributeValue::Boolean(false),
            AttributeValue::Integer(-42),
            AttributeValue::Double(0.25),
            AttributeValue::Binary(b"binary payload".to_vec()),
            AttributeValue::CharVector(b"raw chars".to_vec()),
            AttributeValue::StringIntPair("windows-1252".into(), 40),
            AttributeValue::StringFloatPairVector(vec![
                ("English".into(), 0.75),
                ("German".into(), 0.125),
            ]),
        ];
        for value in samples {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn test_pair_text_may_contain_colons() {
        let value = AttributeValue::StringIntPair("ISO-8859-1:1987".into(), 80);
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_non_utf8_bytes_roundtrip_exactly() {
        // "café" in ISO-8859-1: 0xE9 is not valid UTF-8 on its own.
        let latin1 = vec![0x63, 0x61, 0x66, 0xE9];
        let value = AttributeValue::CharVector(latin1.clone());
        assert_eq!(roundtrip(value.clone()), value);

        let value = AttributeValue::Binary(vec![0x00, 0xFF, 0xFE, 0x80]);
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_byte_variants_serialize_as_base64() {
        let value = AttributeValue::CharVector(b"payload".to_vec());
        assert_eq!(value.serialize(), "AttributeBagCharVector:cGF5bG9hZA==");
        // the rendering stays human-readable
        assert_eq!(value.to_string(), "payload");
    }

    #[test]
    fn test_rendering() {
        assert_eq!(AttributeValue::StringIntPair("UTF-8".into(), 100).to_string(), "(UTF-8, 100)");
        assert_eq!(
            AttributeValue::StringFloatPairVector(vec![("English".into(), 0.5)]).to_string(),
            "(English, 0.5);"
        );
        assert_eq!(AttributeValue::Boolean(false).to_string(), "0");
    }

    proptest! {
        #[test]
        fn prop_text_roundtrips(text in "[^:;\\\\]*") {
            let value = AttributeValue::Text(text);
            prop_assert_eq!(roundtrip(value.clone()), value);
        }

        #[test]
        fn prop_integer_roundtrips(number in any::<i64>()) {
            let value = AttributeValue::Integer(number);
            prop_assert_eq!(roundtrip(value.clone()), value);
        }

        #[test]
        fn prop_double_roundtrips(number in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            let value = AttributeValue::Double(number);
            prop_assert_eq!(roundtrip(value.clone()), value);
        }
    }
}
