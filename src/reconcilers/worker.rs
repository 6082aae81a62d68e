// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Worker loop - pulls keys from a queue and hands them to a reconciler.

use crate::sync::{Reconcile, WorkQueue};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Worker {
    id: usize,
    queue: Arc<WorkQueue>,
    reconciler: Arc<dyn Reconcile>,
}

impl Worker {
    pub fn new(id: usize, queue: Arc<WorkQueue>, reconciler: Arc<dyn Reconcile>) -> Self {
        Self {
            id,
            queue,
            reconciler,
        }
    }

    /// Process keys until the queue shuts down
    pub async fn run(self) {
        debug!(
            "{} worker {} started on queue {}",
            self.reconciler.name(),
            self.id,
            self.queue.name()
        );
        while self.process_next().await {}
        info!("{} worker {} stopped", self.reconciler.name(), self.id);
    }

    /// Handle one key. Returns false once the queue is shut down.
    pub async fn process_next(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        match self.reconciler.reconcile(&key).await {
            Ok(()) => {
                debug!("Synced {} {}", self.reconciler.name(), key);
                self.queue.forget(&key);
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    "Error syncing {} {} (attempt {}), requeueing: {}",
                    self.reconciler.name(),
                    key,
                    self.queue.num_requeues(&key) + 1,
                    e
                );
                self.queue.add_rate_limited(&key);
            }
            Err(e) => {
                error!(
                    "Dropping {} {} after non-retryable error: {}",
                    self.reconciler.name(),
                    key,
                    e
                );
                self.queue.forget(&key);
            }
        }

        self.queue.done(&key);
        true
    }
}
