// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runtime services: the process-wide stage registry.

pub mod registry;

pub use registry::{register_builtin_stages, registry, StageHandle, StageRegistry};
