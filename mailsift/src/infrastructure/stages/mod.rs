// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Leaf stages shipped with the engine. Each is a registry plugin with its
//! own JSON-Schema; together they exercise the core contracts (load, enrich,
//! verify, filter, observe).

pub mod add_attr;
pub mod attr_logger;
pub mod email_filter;
pub mod email_loader;
pub mod ensure_attr;

pub use add_attr::AddAttrStage;
pub use attr_logger::AttrLoggerStage;
pub use email_filter::EmailFilterStage;
pub use email_loader::EmailLoaderStage;
pub use ensure_attr::EnsureAttrStage;
