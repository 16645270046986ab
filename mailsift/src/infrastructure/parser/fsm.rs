// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parser State Machine
//!
//! Line-driven FSM turning decoded email text into an [`Email`] record.
//!
//! States: `NotReading`, `Header`, `EmailPartBody`, `MimeHeader`,
//! `MimeBody`. A state handler either consumes the line or asks for it to be
//! re-dispatched to the state it just switched to, so a single line can move
//! the machine and still be processed by the new state.
//!
//! Header continuation lines (leading space or tab) extend the current
//! header value. A header value matching `multipart/...boundary=...` flips
//! the record into multipart mode and remembers the boundary; the body is
//! then parsed part by part, each part carrying its own header map. A
//! missing closing boundary marker is tolerated: the final part is emitted
//! at end of file.

use std::collections::BTreeMap;
use std::mem;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, warn};

use mailsift_domain::{
    AttributeValue, Email, EmailBody, EngineError, MimePart, StoreView, ATTR_ENCODING,
    ATTR_FILE_BYTES, ATTR_FILE_ID, ATTR_LANGUAGE,
};

use crate::infrastructure::parser::encoding::{convert_to_utf8, detect_encoding};
use crate::infrastructure::parser::language::{predict_languages, NUM_PREDICTIONS};

static HEADER_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w-]+): (.*)$").expect("valid header regex"));
static MULTIPART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*multipart/.*?boundary="?([^";\s]+)"?$"#).expect("valid multipart regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingState {
    NotReading,
    Header,
    EmailPartBody,
    MimeHeader,
    MimeBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Standard,
    Multipart,
}

/// Streaming parser feeding one target view.
///
/// The parser owns all per-email accumulation state and resets it after
/// every flush, so one parser instance handles an entire directory tree.
pub struct EmailParser<'v, 's> {
    view: &'v mut StoreView<'s>,
    state: ReadingState,
    is_multipart: bool,
    boundary: String,
    header_key: String,
    header_val: String,
    body: String,
    mime_body: String,
    mime_header_key: String,
    mime_header_val: String,
    mime_headers: BTreeMap<String, Vec<String>>,
    parts: Vec<MimePart>,
    body_kind: Option<BodyKind>,
    email: Email,
}

impl<'v, 's> EmailParser<'v, 's> {
    pub fn new(view: &'v mut StoreView<'s>) -> Self {
        Self {
            view,
            state: ReadingState::NotReading,
            is_multipart: false,
            boundary: String::new(),
            header_key: String::new(),
            header_val: String::new(),
            body: String::new(),
            mime_body: String::new(),
            mime_header_key: String::new(),
            mime_header_val: String::new(),
            mime_headers: BTreeMap::new(),
            parts: Vec::new(),
            body_kind: None,
            email: Email::new(),
        }
    }

    /// Recursively parses a directory of emails, or a single email file.
    ///
    /// Per-file failures are logged and skipped; errors reaching the
    /// directory walk itself abort the parse.
    pub fn parse(&mut self, path: &Path) -> Result<(), EngineError> {
        let file_type = std::fs::metadata(path)?.file_type();
        if file_type.is_file() {
            self.email
                .insert_attribute(ATTR_FILE_ID, AttributeValue::Text(path.display().to_string()));
            if let Err(file_error) = self.read_email(path) {
                error!(
                    "error while reading file {} with error: {}",
                    path.display(),
                    file_error
                );
                self.reset();
            }
        } else if file_type.is_dir() {
            for entry in std::fs::read_dir(path)? {
                self.parse(&entry?.path())?;
            }
        } else {
            warn!("unknown file type: {}", path.display());
        }
        Ok(())
    }

    fn read_email(&mut self, path: &Path) -> Result<(), EngineError> {
        let bytes = std::fs::read(path)?;
        self.email
            .insert_attribute(ATTR_FILE_BYTES, AttributeValue::CharVector(bytes.clone()));

        let detected = detect_encoding(&bytes)
            .ok_or_else(|| EngineError::EncodingUnknown(path.display().to_string()))?;
        self.email.insert_attribute(
            ATTR_ENCODING,
            AttributeValue::StringIntPair(detected.name.clone(), detected.confidence),
        );

        let text = convert_to_utf8(&bytes, &detected.name)?;
        self.email.insert_attribute(
            ATTR_LANGUAGE,
            AttributeValue::StringFloatPairVector(predict_languages(&text, NUM_PREDICTIONS)),
        );

        for line in text.lines() {
            self.process_line(line);
        }
        self.flush()
    }

    /// Dispatches a line to the current state handler, re-dispatching until
    /// some state consumes it.
    fn process_line(&mut self, line: &str) {
        loop {
            let consumed = match self.state {
                ReadingState::NotReading => self.handle_not_reading(line),
                ReadingState::Header => self.handle_header(line),
                ReadingState::EmailPartBody => self.handle_email_part_body(line),
                ReadingState::MimeHeader => self.handle_mime_header(line),
                ReadingState::MimeBody => self.handle_mime_body(line),
            };
            if consumed {
                break;
            }
        }
    }

    fn handle_not_reading(&mut self, line: &str) -> bool {
        if !line.is_empty() {
            self.state = ReadingState::Header;
            return false;
        }
        true
    }

    fn handle_header(&mut self, line: &str) -> bool {
        if !line.is_empty() {
            if line.starts_with(' ') || line.starts_with('\t') {
                // continuation of the previous header line
                self.header_val.push_str(line);
                return true;
            }
            if self.header_key.is_empty() && self.header_val.is_empty() {
                debug!("first line of header");
            } else {
                self.check_if_multipart();
                let key = mem::take(&mut self.header_key);
                let value = mem::take(&mut self.header_val);
                self.email.set_header(&key, &value);
            }
            if let Some(captures) = HEADER_KEY_RE.captures(line) {
                self.header_key = captures[1].to_string();
                self.header_val = captures[2].to_string();
            }
            return true;
        }

        // blank line ends the header section
        self.check_if_multipart();
        let key = mem::take(&mut self.header_key);
        let value = mem::take(&mut self.header_val);
        self.email.set_header(&key, &value);
        if self.is_multipart {
            self.body_kind = Some(BodyKind::Multipart);
            self.state = ReadingState::MimeHeader;
        } else {
            self.body_kind = Some(BodyKind::Standard);
            self.email.set_multipart(false);
            self.state = ReadingState::EmailPartBody;
        }
        true
    }

    fn check_if_multipart(&mut self) {
        if let Some(captures) = MULTIPART_RE.captures(&self.header_val) {
            self.boundary = captures[1].to_string();
            debug!("multipart boundary: {}", self.boundary);
            self.is_multipart = true;
            self.email.set_multipart(true);
        }
    }

    fn handle_email_part_body(&mut self, line: &str) -> bool {
        self.body.push_str(line);
        true
    }

    fn handle_mime_header(&mut self, line: &str) -> bool {
        if !line.is_empty() {
            if line.starts_with(' ') || line.starts_with('\t') {
                self.mime_header_val.push_str(line);
                return true;
            }
            if self.mime_header_key.is_empty() && self.mime_header_val.is_empty() {
                // The first line of a part is the boundary marker itself;
                // record it under a synthetic Boundary header.
                self.mime_header_val.push_str(line);
                self.mime_header_key.push_str("Boundary");
            } else {
                let key = mem::take(&mut self.mime_header_key);
                let value = mem::take(&mut self.mime_header_val);
                self.mime_headers.insert(key, vec![value]);
                if let Some(captures) = HEADER_KEY_RE.captures(line) {
                    self.mime_header_key = captures[1].to_string();
                    self.mime_header_val = captures[2].to_string();
                }
            }
            return true;
        }

        let key = mem::take(&mut self.mime_header_key);
        let value = mem::take(&mut self.mime_header_val);
        self.mime_headers.insert(key, vec![value]);
        self.state = ReadingState::MimeBody;
        false
    }

    fn handle_mime_body(&mut self, line: &str) -> bool {
        if line == format!("--{}", self.boundary) {
            debug!("hit boundary, starting next part");
            let headers = mem::take(&mut self.mime_headers);
            let content = mem::take(&mut self.mime_body);
            self.parts.push(MimePart::new(headers, content));
            self.state = ReadingState::MimeHeader;
            return false;
        }
        if line == format!("--{}--", self.boundary) {
            debug!("end of multipart parts");
            return true;
        }
        self.mime_body.push_str(line);
        true
    }

    /// End-of-file flush: closes the accumulated body, finalizes the email,
    /// deduplicates against the target view, and stages the insert.
    fn flush(&mut self) -> Result<(), EngineError> {
        match self.body_kind {
            Some(BodyKind::Multipart) => {
                let headers = mem::take(&mut self.mime_headers);
                let content = mem::take(&mut self.mime_body);
                self.parts.push(MimePart::new(headers, content));
            }
            Some(BodyKind::Standard) => {}
            None => {
                if self.is_multipart {
                    self.reset();
                    return Err(EngineError::MalformedEmail(
                        "multipart email ended before its body started".into(),
                    ));
                }
                warn!("file being loaded is likely not an email");
            }
        }

        if self.state == ReadingState::EmailPartBody || self.state == ReadingState::MimeBody {
            self.state = ReadingState::NotReading;
            let body = match self.body_kind {
                Some(BodyKind::Multipart) => EmailBody::Multipart(mem::take(&mut self.parts)),
                _ => EmailBody::Standard(mem::take(&mut self.body)),
            };
            self.email.set_body(body);
            self.email.finalize()?;
            let email = mem::replace(&mut self.email, Email::new());
            if self.view.contains_hash(email.content_hash()) {
                debug!("email already exists: {}", email.content_hash());
            } else {
                debug!("inserting email: {}", email.content_hash());
                self.view.insert_email(email);
            }
            self.reset();
        } else {
            warn!("flushed from wrong state");
            self.reset();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state = ReadingState::NotReading;
        self.is_multipart = false;
        self.boundary.clear();
        self.header_key.clear();
        self.header_val.clear();
        self.body.clear();
        self.mime_body.clear();
        self.mime_header_key.clear();
        self.mime_header_val.clear();
        self.mime_headers.clear();
        self.parts.clear();
        self.body_kind = None;
        self.email = Email::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailsift_domain::EmailStore;
    use std::io::Write;

    fn parse_bytes(store: &EmailStore, name: &str, bytes: &[u8]) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        drop(file);

        let mut view = store.full_view();
        let mut parser = EmailParser::new(&mut view);
        parser.parse(&path).unwrap();
        view.commit();
    }

    fn single_email(store: &EmailStore) -> Email {
        let mut found = None;
        store.full_view().for_each(|email| found = Some(email.clone()));
        found.expect("store should hold one email")
    }

    #[test]
    fn test_plain_email_roundtrip() {
        let store = EmailStore::new();
        parse_bytes(&store, "plain.eml", b"From: a@b\r\nSubject: hi\r\n\r\nhello");
        assert_eq!(store.len(), 1);

        let email = single_email(&store);
        assert_eq!(email.headers().get("From").unwrap(), "a@b");
        assert_eq!(email.headers().get("Subject").unwrap(), "hi");
        assert!(!email.is_multipart());
        assert_eq!(email.body().unwrap().all_data(), "hello");

        match email.attribute(ATTR_ENCODING).unwrap() {
            AttributeValue::StringIntPair(name, confidence) => {
                assert!(name.starts_with("US-ASCII") || name.starts_with("ISO-8859-1"));
                assert!(*confidence > 0);
            }
            other => panic!("unexpected encoding attribute: {:?}", other),
        }
        match email.attribute(ATTR_LANGUAGE).unwrap() {
            AttributeValue::StringFloatPairVector(predictions) => {
                assert!(predictions.len() <= 2);
            }
            other => panic!("unexpected language attribute: {:?}", other),
        }
        assert!(email.attribute(ATTR_FILE_ID).is_some());
    }

    #[test]
    fn test_dedup_across_runs() {
        let store = EmailStore::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.eml");
        std::fs::write(&path, b"From: a@b\r\n\r\nsame body").unwrap();

        for _ in 0..2 {
            let mut view = store.full_view();
            let mut parser = EmailParser::new(&mut view);
            parser.parse(dir.path()).unwrap();
            view.commit();
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_multipart_email() {
        let store = EmailStore::new();
        parse_bytes(
            &store,
            "multi.eml",
            b"From: a@b\r\nContent-Type: multipart/mixed; boundary=\"X\"\r\n\r\n--X\r\nContent-Type: text/plain\r\n\r\npart1\r\n--X--",
        );
        assert_eq!(store.len(), 1);

        let email = single_email(&store);
        assert!(email.is_multipart());
        let parts = email.body().unwrap().parts().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(
            parts[0].headers().get("Content-Type").unwrap(),
            &vec!["text/plain".to_string()]
        );
        assert_eq!(parts[0].content(), "part1");
    }

    #[test]
    fn test_multipart_without_closing_boundary_emits_last_part() {
        let store = EmailStore::new();
        parse_bytes(
            &store,
            "unterminated.eml",
            b"Content-Type: multipart/mixed; boundary=\"B\"\r\n\r\n--B\r\nContent-Type: text/plain\r\n\r\nfirst\r\n--B\r\nContent-Type: text/html\r\n\r\nsecond",
        );
        assert_eq!(store.len(), 1);
        let email = single_email(&store);
        let parts = email.body().unwrap().parts().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].content(), "second");
    }

    #[test]
    fn test_zero_byte_file_inserts_nothing() {
        let store = EmailStore::new();
        store.insert({
            let mut email = Email::new();
            email.insert_attribute(ATTR_FILE_BYTES, AttributeValue::CharVector(b"seed".to_vec()));
            email.finalize().unwrap();
            email
        });
        parse_bytes(&store, "empty.eml", b"");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_continuation_on_first_header_line_is_not_a_key() {
        let store = EmailStore::new();
        parse_bytes(&store, "cont.eml", b" leading continuation\r\nFrom: a@b\r\n\r\nbody");
        assert_eq!(store.len(), 1);
        let email = single_email(&store);
        assert_eq!(email.headers().get("From").unwrap(), "a@b");
        assert!(!email.headers().contains_key("leading"));
        assert!(!email.headers().contains_key("leading continuation"));
    }

    #[test]
    fn test_folded_header_value_is_joined() {
        let store = EmailStore::new();
        parse_bytes(
            &store,
            "folded.eml",
            b"Subject: part one\r\n part two\r\nFrom: a@b\r\n\r\nbody",
        );
        let email = single_email(&store);
        assert_eq!(email.headers().get("Subject").unwrap(), "part one part two");
    }

    #[test]
    fn test_two_distinct_files_both_insert() {
        let store = EmailStore::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.eml"), b"From: a@b\r\n\r\nfirst").unwrap();
        std::fs::write(dir.path().join("b.eml"), b"From: c@d\r\n\r\nsecond").unwrap();

        let mut view = store.full_view();
        let mut parser = EmailParser::new(&mut view);
        parser.parse(dir.path()).unwrap();
        view.commit();
        assert_eq!(store.len(), 2);
    }
}
