// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decide what a watch notification means for replication.

use crate::kubernetes::Notification;
use crate::sync::queue::WorkQueue;
use crate::sync::tracker::DeletionTracker;
use crate::types::{is_terminating, object_key, sync_annotation, Replicated};
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// What to do with a notification about a source object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ignore,
    /// Queue the key for a sync
    Enqueue,
    /// Snapshot the old state for cleanup, and queue the key
    TrackAndEnqueue,
}

/// Classify a notification about a ConfigMap or Secret.
///
/// Removing the sync annotation is handled the same way for every kind: the old state is
/// tracked and the key queued, so copies disappear without waiting for another event.
pub fn classify<K: Replicated>(notification: &Notification<K>) -> Decision {
    match notification {
        Notification::Added(obj) => match sync_annotation(obj) {
            Some(_) => Decision::Enqueue,
            None => Decision::Ignore,
        },
        Notification::Updated { old, new } => {
            match (sync_annotation(old), sync_annotation(new)) {
                (None, None) => Decision::Ignore,
                (None, Some(_)) => Decision::Enqueue,
                (Some(_), None) => Decision::TrackAndEnqueue,
                (Some(before), Some(after)) if before != after => Decision::TrackAndEnqueue,
                (Some(_), Some(_)) if !old.same_payload(new) => Decision::Enqueue,
                (Some(_), Some(_)) => Decision::Ignore,
            }
        }
        Notification::Deleted(obj) => match sync_annotation(obj) {
            Some(_) => Decision::TrackAndEnqueue,
            None => Decision::Ignore,
        },
    }
}

/// Whether a namespace notification needs a namespace sync
pub fn namespace_needs_sync(notification: &Notification<Namespace>) -> bool {
    match notification {
        Notification::Added(_) => true,
        Notification::Updated { old, new } => !is_terminating(new) && old.labels() != new.labels(),
        Notification::Deleted(_) => false,
    }
}

/// Applies [`classify`] decisions for one replicated kind
pub struct Classifier<K: Replicated> {
    queue: Arc<WorkQueue>,
    tracker: Arc<DeletionTracker<K>>,
}

impl<K: Replicated> Classifier<K> {
    pub fn new(queue: Arc<WorkQueue>, tracker: Arc<DeletionTracker<K>>) -> Self {
        Self { queue, tracker }
    }

    pub fn handle(&self, notification: Notification<K>) {
        let decision = classify(&notification);
        if decision == Decision::Ignore {
            return;
        }

        let key = object_key(notification.object());
        debug!("{} {}: {:?}", K::KIND, key, decision);

        // Record before queueing so the worker always finds the snapshot
        if decision == Decision::TrackAndEnqueue {
            if let Some(snapshot) = notification.into_old() {
                self.tracker.record(&key, snapshot);
            }
        }
        self.queue.add(&key);
    }
}
