// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Views
//!
//! A view is a half-open `[start, end)` window over the email store plus a
//! deferred-insert queue. Stages read and mutate the emails inside their
//! window and stage new emails locally; nothing reaches the store until
//! [`StoreView::commit`] drains the queue under the store's exclusive lock.
//!
//! After a commit the view keeps its `start` and re-baselines `end` to the
//! new store size, so the committing stage immediately sees what it
//! published. Other views' ranges may have shifted past their own `end`;
//! they are re-baselined only by their own commit.
//!
//! Iterating a view concurrently with a writer to the same range is a
//! caller error; the engine's executors hand disjoint partitions to
//! parallel workers, and per-element locks keep that safe.

use std::collections::VecDeque;

use serde_json::Value;

use crate::aggregates::email_store::EmailStore;
use crate::entities::Email;

/// A bounded window over the email store with a deferred-insert queue.
pub struct StoreView<'a> {
    store: &'a EmailStore,
    start: usize,
    end: usize,
    pending: VecDeque<Email>,
}

impl<'a> StoreView<'a> {
    pub(crate) fn new(store: &'a EmailStore, start: usize, end: usize) -> Self {
        Self {
            store,
            start,
            end,
            pending: VecDeque::new(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of committed emails inside the window.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of staged, not-yet-committed inserts.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Splits the window into `parts` contiguous, disjoint sub-views of
    /// near-equal size; the first `len() % parts` are one element larger.
    /// Pending inserts stay with this view.
    pub fn split(&self, parts: usize) -> Vec<StoreView<'a>> {
        let total = self.len();
        if parts == 0 || total == 0 {
            return Vec::new();
        }
        let segment = total / parts;
        let remainder = total % parts;
        let mut views = Vec::with_capacity(parts);
        let mut segment_start = self.start;
        for index in 0..parts {
            let segment_end = segment_start + segment + usize::from(index < remainder);
            views.push(StoreView::new(self.store, segment_start, segment_end));
            segment_start = segment_end;
        }
        views
    }

    /// Stages an email for insertion; published on `commit`.
    pub fn insert_email(&mut self, email: Email) {
        self.pending.push_back(email);
    }

    /// Publishes staged inserts to the store and re-baselines `end` to the
    /// new store size. `start` is left unchanged.
    pub fn commit(&mut self) {
        let mut emails = self.store.emails.write();
        for email in self.pending.drain(..) {
            emails.push(parking_lot::Mutex::new(email));
        }
        self.end = emails.len();
    }

    /// Visits each committed email in `[start, end)` at call time.
    pub fn for_each<F: FnMut(&Email)>(&self, mut visit: F) {
        let emails = self.store.emails.read();
        let end = self.end.min(emails.len());
        for slot in emails.iter().take(end).skip(self.start) {
            visit(&slot.lock());
        }
    }

    /// Visits each committed email mutably. Partitions of a parallel
    /// executor hold disjoint ranges, so per-element locks suffice.
    pub fn for_each_mut<F: FnMut(&mut Email)>(&self, mut visit: F) {
        let emails = self.store.emails.read();
        let end = self.end.min(emails.len());
        for slot in emails.iter().take(end).skip(self.start) {
            visit(&mut slot.lock());
        }
    }

    /// Whether any committed email inside the window has this content hash.
    pub fn contains_hash(&self, content_hash: u64) -> bool {
        let emails = self.store.emails.read();
        let end = self.end.min(emails.len());
        emails
            .iter()
            .take(end)
            .skip(self.start)
            .any(|slot| slot.lock().content_hash() == content_hash)
    }

    /// JSON rendering of the committed emails inside the window.
    pub fn simple_json_list(&self) -> Value {
        let emails = self.store.emails.read();
        let end = self.end.min(emails.len());
        Value::Array(
            emails
                .iter()
                .take(end)
                .skip(self.start)
                .map(|slot| slot.lock().to_json())
                .collect(),
        )
    }
}

/// Staged inserts are published when the view goes out of scope, matching
/// the view's scoping to a single `execute` call frame.
impl Drop for StoreView<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.commit();
        }
    }
}
