// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Email Store
//!
//! The shared mutable collection threaded through the execution tree. The
//! store holds an ordered sequence of emails behind a shared-read /
//! exclusive-write lock; stages never touch it directly and instead operate
//! through bounded [`StoreView`] windows.
//!
//! ## Locking discipline
//!
//! The sequence itself is guarded by a `parking_lot::RwLock`; each element
//! additionally sits behind its own `Mutex` so disjoint view partitions can
//! mutate their emails in parallel while holding only the shared read lock.
//! All writes to the sequence (insert, remove, view commits) are totally
//! ordered by the exclusive lock. The store outlives all of its views, which
//! borrow it for the duration of one `execute` call.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::aggregates::store_view::StoreView;
use crate::entities::Email;

/// Shared, lock-guarded collection of email records.
#[derive(Default)]
pub struct EmailStore {
    pub(crate) emails: RwLock<Vec<Mutex<Email>>>,
}

impl EmailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an email. Exclusive.
    pub fn insert(&self, email: Email) {
        self.emails.write().push(Mutex::new(email));
    }

    /// Removes every element equal to `email` by content hash. Exclusive.
    pub fn remove(&self, email: &Email) {
        self.emails
            .write()
            .retain(|candidate| candidate.lock().content_hash() != email.content_hash());
    }

    /// Number of committed emails. Shared.
    pub fn len(&self) -> usize {
        self.emails.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.read().is_empty()
    }

    /// A snapshot view over indices `[0, len())`. Shared.
    pub fn full_view(&self) -> StoreView<'_> {
        let end = self.emails.read().len();
        StoreView::new(self, 0, end)
    }

    /// Splits the store into `parts` contiguous, disjoint views covering
    /// `[0, len())`; the first `len() % parts` ranges are one element larger.
    pub fn split(&self, parts: usize) -> Vec<StoreView<'_>> {
        self.full_view().split(parts)
    }

    /// JSON rendering of every committed email.
    pub fn simple_json_list(&self) -> Value {
        let emails = self.emails.read();
        Value::Array(emails.iter().map(|email| email.lock().to_json()).collect())
    }

    /// JSON rendering of up to `count` emails starting at `start`, for
    /// paging external surfaces.
    pub fn emails_by_number(&self, start: usize, count: usize) -> Value {
        let emails = self.emails.read();
        if start >= emails.len() {
            return Value::Array(Vec::new());
        }
        let end = (start + count).min(emails.len());
        Value::Array(
            emails[start..end]
                .iter()
                .map(|email| email.lock().to_json())
                .collect(),
        )
    }
}
