// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Email body variants: a plain standard body or an ordered sequence of MIME
//! multipart parts.

use std::collections::BTreeMap;

/// One MIME multipart section: its own header mapping plus a body payload.
///
/// Part headers are multi-valued; the parser records one value per captured
/// header line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MimePart {
    headers: BTreeMap<String, Vec<String>>,
    content: String,
}

impl MimePart {
    pub fn new(headers: BTreeMap<String, Vec<String>>, content: String) -> Self {
        Self { headers, content }
    }

    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.headers
    }

    pub fn header_keys(&self) -> Vec<String> {
        self.headers.keys().cloned().collect()
    }

    pub fn header_values(&self) -> Vec<String> {
        self.headers.values().flatten().cloned().collect()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Renders the part's headers as `Key: value` lines.
    pub fn header_block(&self) -> String {
        let mut block = String::new();
        for (key, values) in &self.headers {
            block.push_str(key);
            block.push_str(": ");
            for value in values {
                block.push_str(value);
            }
            block.push_str("\r\n");
        }
        block
    }
}

/// Exactly one of the two body shapes an email record can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailBody {
    /// A single text body.
    Standard(String),
    /// An ordered sequence of MIME multipart parts.
    Multipart(Vec<MimePart>),
}

impl EmailBody {
    /// Flattens the body into a single text rendering.
    ///
    /// Multipart bodies concatenate each part's header block and payload.
    pub fn all_data(&self) -> String {
        match self {
            EmailBody::Standard(content) => content.clone(),
            EmailBody::Multipart(parts) => {
                let mut data = String::new();
                for part in parts {
                    data.push_str(&part.header_block());
                    data.push_str("\r\n");
                    data.push_str(part.content());
                }
                data
            }
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, EmailBody::Multipart(_))
    }

    /// The multipart parts, or `None` for a standard body.
    pub fn parts(&self) -> Option<&[MimePart]> {
        match self {
            EmailBody::Multipart(parts) => Some(parts),
            EmailBody::Standard(_) => None,
        }
    }
}
