// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Snapshots of sources whose copies must be cleaned up.

use dashmap::DashMap;

/// Last annotated state of sources whose sync annotation was removed or changed, or which
/// were deleted. Filled by the classifier, drained by the replicator at the start of the
/// next sync for that key.
///
/// Each key holds a list so that two selector changes landing before one sync both get
/// their old copies cleaned.
pub struct DeletionTracker<K> {
    entries: DashMap<String, Vec<K>>,
}

impl<K> DeletionTracker<K> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn record(&self, key: &str, snapshot: K) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .push(snapshot);
    }

    /// Remove and return every snapshot recorded for `key`
    pub fn take(&self, key: &str) -> Vec<K> {
        self.entries
            .remove(key)
            .map(|(_, snapshots)| snapshots)
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> Default for DeletionTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
