// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-system set of discovered network paths.
//
// A system announced over several interfaces or address families shows up
// once per path.  The set deduplicates by the (family, domain, host, port)
// tuple and tolerates removals for paths it never saw, since the mDNS layer
// may report a removal while the matching resolution was still in flight.

use indexmap::IndexSet;

use ippscope_core::types::SourceRecord;

/// Result of adding a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Result of removing a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    NotFound,
    Removed { remaining: usize },
}

/// Discovered network paths for one system, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    records: IndexSet<SourceRecord>,
}

impl SourceSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path. A path equal to one already held is not stored twice.
    pub fn add(&mut self, record: SourceRecord) -> AddOutcome {
        if self.records.insert(record) {
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyPresent
        }
    }

    /// Forget a path, reporting how many remain so the caller can tell when
    /// the system has become unreachable.
    pub fn remove(&mut self, record: &SourceRecord) -> RemoveOutcome {
        if self.records.shift_remove(record) {
            RemoveOutcome::Removed {
                remaining: self.records.len(),
            }
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Number of distinct paths held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` once every path has been withdrawn.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Paths in the order they were first discovered.
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter()
    }
}
