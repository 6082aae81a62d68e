// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! De-duplicating, rate limited work queue of object keys.

use crate::constants::queue::{BASE_RETRY_DELAY_MS, MAX_RETRY_DELAY_SECS};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Work queue with the semantics reconcilers expect:
///
/// - a key is queued at most once, no matter how often it is added
/// - a key being processed is not handed out again until [`WorkQueue::done`]; adds in the
///   meantime are remembered and re-queue it on `done`
/// - failed keys come back after a per-key exponential delay
pub struct WorkQueue {
    name: &'static str,
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    /// Keys that need processing (queued, or added again while in flight)
    dirty: HashSet<String>,
    processing: HashSet<String>,
    failures: HashMap<String, u32>,
    shutting_down: bool,
}

impl WorkQueue {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add(&self, key: &str) {
        let mut state = self.state.lock();
        if state.shutting_down || !state.dirty.insert(key.to_string()) {
            return;
        }
        if state.processing.contains(key) {
            return;
        }
        state.queue.push_back(key.to_string());
        drop(state);
        self.notify.notify_one();
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    // Hand the wakeup on in case more keys are waiting
                    if !state.queue.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Mark a key as processed. Re-queues it if it was added while in flight.
    pub fn done(&self, key: &str) {
        let mut state = self.state.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.to_string());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Add the key again after its backoff delay
    pub fn add_rate_limited(self: &Arc<Self>, key: &str) {
        let delay = {
            let mut state = self.state.lock();
            let failures = state.failures.entry(key.to_string()).or_insert(0);
            *failures += 1;
            retry_delay(*failures)
        };

        debug!("Requeueing {} on {} in {:?}", key, self.name, delay);
        let queue = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(&key);
        });
    }

    /// Reset the failure count of a key
    pub fn forget(&self, key: &str) {
        self.state.lock().failures.remove(key);
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.state.lock().failures.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out keys. Workers finish their current key and exit.
    pub fn shutdown(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }
}

/// Exponential per-key delay: 5ms, 10ms, 20ms, ... capped at 1000s
fn retry_delay(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(32);
    let millis = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(millis).min(Duration::from_secs(MAX_RETRY_DELAY_SECS))
}
