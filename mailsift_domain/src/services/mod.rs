// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain service contracts: the stage and executor traits every processing
//! node implements.

pub mod stage;

pub use crate::entities::email::{ATTR_ENCODING, ATTR_FILE_BYTES, ATTR_FILE_ID, ATTR_LANGUAGE};
pub use stage::{clean_schema, Executor, Stage, StageCore, IFACE_EXECUTOR, IFACE_STAGE};
