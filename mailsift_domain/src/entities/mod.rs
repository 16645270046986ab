// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities of the engine domain.

pub mod email;
pub mod email_body;
pub mod lifecycle;

pub use email::{Email, ATTR_ENCODING, ATTR_FILE_BYTES, ATTR_FILE_ID, ATTR_LANGUAGE};
pub use email_body::{EmailBody, MimePart};
pub use lifecycle::{StageState, StateMachine};
