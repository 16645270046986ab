// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Email Parser
//!
//! The algorithmic heart of the engine: a streaming finite-state parser that
//! decodes arbitrarily-encoded email files into the canonical structured
//! form.
//!
//! Per-file pipeline:
//!
//! 1. Read the file bytes and attach them as the `File bytes` attribute.
//! 2. Detect the source character set; record `(encoding, confidence)`.
//! 3. Convert the bytes to UTF-8.
//! 4. Identify the language; record the top predictions with probabilities.
//! 5. Feed the text line by line through the FSM.
//! 6. At end of file, flush, hash, deduplicate against the target view and
//!    insert.
//!
//! Failures in any step are fatal for that file only; the parser logs and
//! continues with the next file.

pub mod encoding;
pub mod fsm;
pub mod language;

pub use fsm::EmailParser;
