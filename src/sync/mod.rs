// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Event classification, work queues and the replication logic behind them.

pub mod classifier;
pub mod namespace;
pub mod queue;
pub mod replicator;
pub mod tracker;

pub use classifier::{classify, namespace_needs_sync, Classifier, Decision};
pub use namespace::NamespaceSync;
pub use queue::WorkQueue;
pub use replicator::Replicator;
pub use tracker::DeletionTracker;

use crate::error::Result;
use crate::types::Replicated;
use async_trait::async_trait;

/// Something a worker can hand a queue key to
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// Kind name, used in logs
    fn name(&self) -> &'static str;

    async fn reconcile(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<K: Replicated> Reconcile for Replicator<K> {
    fn name(&self) -> &'static str {
        K::KIND
    }

    async fn reconcile(&self, key: &str) -> Result<()> {
        self.sync(key).await
    }
}

#[async_trait]
impl Reconcile for NamespaceSync {
    fn name(&self) -> &'static str {
        "Namespace"
    }

    async fn reconcile(&self, key: &str) -> Result<()> {
        self.sync(key).await
    }
}
