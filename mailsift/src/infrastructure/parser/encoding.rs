// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Character-Set Detection and Conversion
//!
//! Detection runs `chardet` over the raw file bytes and reports the charset
//! name together with a 0–100 confidence. Conversion resolves the detected
//! name as a WHATWG encoding label and decodes to UTF-8 with `encoding_rs`,
//! substituting replacement characters for unmappable sequences.

use encoding_rs::Encoding;
use tracing::debug;

use mailsift_domain::EngineError;

/// A detection result: canonical charset name plus confidence in percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedEncoding {
    pub name: String,
    pub confidence: i64,
}

/// Detects the character set of a byte sequence.
///
/// Returns `None` when the detector produces no match; the caller treats
/// that as `EncodingUnknown` for the file.
pub fn detect_encoding(bytes: &[u8]) -> Option<DetectedEncoding> {
    let (charset, confidence, _language) = chardet::detect(bytes);
    if charset.is_empty() {
        return None;
    }
    Some(DetectedEncoding {
        name: canonical_name(&charset),
        confidence: (f64::from(confidence) * 100.0).round() as i64,
    })
}

/// Maps detector names onto the canonical names recorded in the `Encoding`
/// attribute.
fn canonical_name(charset: &str) -> String {
    match charset.to_ascii_lowercase().as_str() {
        "ascii" | "us-ascii" => "US-ASCII".to_string(),
        "utf-8" => "UTF-8".to_string(),
        "utf-16le" => "UTF-16LE".to_string(),
        "utf-16be" => "UTF-16BE".to_string(),
        "iso-8859-1" | "latin1" => "ISO-8859-1".to_string(),
        _ => charset.to_string(),
    }
}

/// Converts a byte sequence to UTF-8 using the detected charset.
///
/// Fails when no converter exists for the name; unmappable sequences decode
/// to replacement characters rather than failing the file.
pub fn convert_to_utf8(bytes: &[u8], encoding_name: &str) -> Result<String, EngineError> {
    let encoding = Encoding::for_label(encoding_name.as_bytes()).ok_or_else(|| {
        EngineError::DecodeFailure(format!("no converter available for {}", encoding_name))
    })?;
    let (text, _actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("replacement characters substituted while decoding {}", encoding_name);
    }
    Ok(text.into_owned())
}
