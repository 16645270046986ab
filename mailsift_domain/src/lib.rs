// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mailsift Domain
//!
//! The mailsift domain represents the core business logic and rules of the
//! email-corpus processing engine. It is completely independent of external
//! concerns like file systems, character-set detection libraries, or user
//! interfaces.
//!
//! ## Domain-Driven Design Concepts
//!
//! ### Entities
//! Entities have a distinct identity that runs through time and different
//! representations.
//!
//! **Examples in this domain:**
//! - `Email`: A normalised email record with headers, body, attribute bag and
//!   a 64-bit content hash that serves as its identity
//! - `StateMachine`: The lifecycle state of a processing stage, together with
//!   its allowed-transition table
//!
//! ### Value Objects
//! Value objects are immutable objects defined entirely by their attributes.
//!
//! **Examples in this domain:**
//! - `AttributeValue`: A typed, self-describing enrichment value with a
//!   round-trippable serialized form
//! - `EmailBody` / `MimePart`: The standard or multipart body variants
//!
//! ### Aggregates
//! Aggregates guard a consistency boundary around a cluster of objects.
//!
//! **Examples in this domain:**
//! - `EmailStore`: The shared, lock-guarded collection of emails, reachable
//!   by stages only through bounded `StoreView` windows
//!
//! ### Domain Services
//! Domain services express contracts that do not belong to a single entity.
//!
//! **Examples in this domain:**
//! - `Stage`: The contract every processing stage implements
//! - `Executor`: The additional capability composite stages expose for
//!   child management
//!
//! ## Business Rules and Invariants
//!
//! - For every attribute value `v`, `deserialize(serialize(v)) == v`
//! - Two emails compare equal exactly when their content hashes are equal
//! - `split(n)` partitions are contiguous, disjoint, cover the store, and
//!   differ in size by at most one
//! - A stage transition is accepted only if it appears in the stage's
//!   transition table; rejected transitions leave the state unchanged

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
// These exports provide a clean API surface for consumers of the domain layer
pub use aggregates::{EmailStore, StoreView};
pub use entities::{Email, EmailBody, MimePart, StageState, StateMachine};
pub use error::EngineError;
pub use services::{Executor, Stage, StageCore, ATTR_ENCODING, ATTR_FILE_BYTES, ATTR_FILE_ID, ATTR_LANGUAGE};
pub use value_objects::{attribute_registry, AttributeRegistry, AttributeValue};
