// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mailsift
//!
//! An offline email-corpus processing engine. Raw email files are normalised
//! into a uniform in-memory representation, enriched with typed attributes,
//! and handed through a user-configurable tree of processing stages that run
//! serially or in parallel, driven by a persisted workflow document.
//!
//! ## Architecture Overview
//!
//! The engine follows the layered architecture of the domain crate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Use Cases, Engine Service)                                │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (Email, Attribute Values, Store/Views, Stage Contracts)    │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Stage Registry, Executors, Parser, Adapter Stages,        │
//! │   Configuration, Workflow Library)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Workflow
//! A persisted JSON document naming the outer executor and its nested
//! options. The root stage validates it, instantiates the child tree, and
//! reduces the run to a single success/failure for the outside world.
//!
//! ### Stages
//! Registry plugins implementing the domain `Stage` contract. Composite
//! stages (root, serial, parallel) orchestrate children; leaf stages load,
//! enrich or inspect emails through a bounded view of the store.
//!
//! ### Parser
//! A streaming finite-state parser that decodes arbitrarily-encoded email
//! files: encoding detection, UTF-8 conversion, language identification,
//! then a line-by-line FSM producing headers, bodies and MIME parts.

pub mod application;
pub mod infrastructure;

pub use application::services::EngineService;
pub use application::use_cases::run_workflow::{run_workflow, RunWorkflowOutcome};
pub use infrastructure::runtime::registry::{register_builtin_stages, registry, StageHandle, StageRegistry};
