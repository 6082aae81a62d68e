// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Replication of one Source kind into its target namespaces.

use crate::error::{Result, SyncError};
use crate::kubernetes::{NamespaceLister, ObjectStore};
use crate::sync::tracker::DeletionTracker;
use crate::types::{
    build_copy, is_terminating, split_key, sync_annotation, Provenance, Replicated, Selector,
};
use chrono::Utc;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Keeps the Copies of every annotated Source of kind `K` converged.
pub struct Replicator<K: Replicated> {
    store: Arc<dyn ObjectStore<K>>,
    namespaces: Arc<dyn NamespaceLister>,
    tracker: Arc<DeletionTracker<K>>,
}

impl<K: Replicated> Replicator<K> {
    pub fn new(
        store: Arc<dyn ObjectStore<K>>,
        namespaces: Arc<dyn NamespaceLister>,
        tracker: Arc<DeletionTracker<K>>,
    ) -> Self {
        Self {
            store,
            namespaces,
            tracker,
        }
    }

    /// Reconcile the Source at `key`.
    ///
    /// Copies left behind by earlier annotated states are deleted first, except in
    /// namespaces the live Source still targets, then the live Source is copied into every
    /// namespace its selector currently matches. A failure in one namespace does not stop
    /// the others; the key then fails with [`SyncError::PartialSync`] so it gets retried.
    #[instrument(skip(self), fields(kind = K::KIND))]
    pub async fn sync(&self, key: &str) -> Result<()> {
        let (namespace, name) = split_key(key)?;

        let desired = self.desired(key, namespace, name).await?;
        let still_targeted = desired
            .as_ref()
            .map(|(_, _, targets)| targets.clone())
            .unwrap_or_default();

        let mut failed = self.cleanup(key, namespace, name, &still_targeted).await?;

        let Some((source, selector, targets)) = desired else {
            return partial(key, failed);
        };
        let copy = build_copy(&source, &selector, Utc::now())?;
        debug!(
            "Replicating {} {} to {} namespace(s)",
            K::KIND,
            key,
            targets.len()
        );

        for target in &targets {
            if let Err(e) = self.converge(target, &copy).await {
                error!("Failed to replicate {} {} to {}: {}", K::KIND, key, target, e);
                failed += 1;
            }
        }

        partial(key, failed)
    }

    /// The live Source, its selector and its target namespaces.
    /// `None` when there is nothing to replicate.
    async fn desired(
        &self,
        key: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<(K, Selector, BTreeSet<String>)>> {
        let Some(source) = self.store.get(namespace, name).await? else {
            debug!("{} {} not found, nothing to sync", K::KIND, key);
            return Ok(None);
        };
        let Some(value) = sync_annotation(&source) else {
            debug!("{} {} is not annotated, nothing to sync", K::KIND, key);
            return Ok(None);
        };
        let selector = match value.parse::<Selector>() {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Not replicating {} {}: {}", K::KIND, key, e);
                return Ok(None);
            }
        };

        let targets = self.target_namespaces(&selector, namespace).await?;
        Ok(Some((source, selector, targets)))
    }

    /// Bring one namespace in line with every Source of this kind: create or update the
    /// Copies of Sources whose selector matches it, and delete orphaned Copies.
    #[instrument(skip(self, namespace), fields(kind = K::KIND, namespace = %namespace.name_any()))]
    pub async fn sync_to_namespace(&self, namespace: &Namespace) -> Result<()> {
        let target = namespace.name_any();
        let labels = namespace.labels();
        let mut failed = 0;

        for source in self.store.list().await? {
            let Some(value) = sync_annotation(&source) else {
                continue;
            };
            if source.namespace().as_deref() == Some(target.as_str()) {
                continue;
            }
            let selector = match value.parse::<Selector>() {
                Ok(selector) => selector,
                Err(e) => {
                    debug!("Skipping {} {}: {}", K::KIND, source.name_any(), e);
                    continue;
                }
            };
            if !selector.matches(labels) {
                continue;
            }

            let copy = build_copy(&source, &selector, Utc::now())?;
            if let Err(e) = self.converge(&target, &copy).await {
                error!(
                    "Failed to replicate {} {}/{} to {}: {}",
                    K::KIND,
                    source.namespace().unwrap_or_default(),
                    source.name_any(),
                    target,
                    e
                );
                failed += 1;
            }
        }

        for existing in self.store.list_in(&target).await? {
            // Sources are never orphans, even if they also carry a provenance record
            if sync_annotation(&existing).is_some() {
                continue;
            }
            let provenance = match Provenance::read(&existing) {
                Ok(Some(provenance)) => provenance,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Leaving {} {}/{} in place: {}",
                        K::KIND,
                        target,
                        existing.name_any(),
                        e
                    );
                    continue;
                }
            };

            let Some(reason) = self.orphan_reason(&provenance, namespace).await? else {
                continue;
            };
            match self.store.delete(&target, &existing.name_any()).await {
                Ok(()) => info!(
                    "Deleted orphaned {} {}/{}: {}",
                    K::KIND,
                    target,
                    existing.name_any(),
                    reason
                ),
                Err(e) => {
                    error!(
                        "Failed to delete orphaned {} {}/{}: {}",
                        K::KIND,
                        target,
                        existing.name_any(),
                        e
                    );
                    failed += 1;
                }
            }
        }

        partial(&target, failed)
    }

    /// Delete Copies made under previously tracked states of `key`. Namespaces in
    /// `still_targeted` are left to the converge step, which reads the cache and would not
    /// see a delete made here yet.
    /// Returns the number of failed deletes. Snapshots with failures are tracked again.
    async fn cleanup(
        &self,
        key: &str,
        namespace: &str,
        name: &str,
        still_targeted: &BTreeSet<String>,
    ) -> Result<usize> {
        let snapshots = self.tracker.take(key);
        if snapshots.is_empty() {
            return Ok(0);
        }

        let namespaces = match self.namespaces.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                for snapshot in snapshots {
                    self.tracker.record(key, snapshot);
                }
                return Err(e);
            }
        };

        let mut failed = 0;
        for snapshot in snapshots {
            let Some(value) = sync_annotation(&snapshot) else {
                continue;
            };
            let selector = match value.parse::<Selector>() {
                Ok(selector) => selector,
                Err(e) => {
                    // Nothing can have been copied under a selector that never parsed
                    debug!("No cleanup for {} {}: {}", K::KIND, key, e);
                    continue;
                }
            };

            let mut snapshot_failed = 0;
            for target in selector.resolve(&namespaces) {
                if target == namespace || still_targeted.contains(&target) {
                    continue;
                }
                if let Err(e) = self.delete_copy(&target, namespace, name).await {
                    error!(
                        "Failed to clean up {} {} in {}: {}",
                        K::KIND,
                        key,
                        target,
                        e
                    );
                    snapshot_failed += 1;
                }
            }

            if snapshot_failed > 0 {
                self.tracker.record(key, snapshot);
                failed += snapshot_failed;
            }
        }

        Ok(failed)
    }

    /// Delete the Copy of `source_namespace/name` in `target`, if the object there is one
    async fn delete_copy(&self, target: &str, source_namespace: &str, name: &str) -> Result<()> {
        let Some(existing) = self.store.get(target, name).await? else {
            return Ok(());
        };

        match Provenance::read(&existing) {
            Ok(Some(provenance)) if provenance.is_from(source_namespace, name) => {
                self.store.delete(target, name).await?;
                info!("Deleted {} {}/{}", K::KIND, target, name);
            }
            Ok(_) => debug!(
                "{} {}/{} is not a copy of {}/{}, leaving it",
                K::KIND,
                target,
                name,
                source_namespace,
                name
            ),
            Err(e) => warn!("Leaving {} {}/{} in place: {}", K::KIND, target, name, e),
        }
        Ok(())
    }

    /// Namespaces the Source should be copied into right now
    async fn target_namespaces(
        &self,
        selector: &Selector,
        source_namespace: &str,
    ) -> Result<BTreeSet<String>> {
        let namespaces = self.namespaces.list_namespaces().await?;
        let mut targets = selector.resolve(namespaces.iter().filter(|ns| !is_terminating(ns)));
        targets.remove(source_namespace);
        Ok(targets)
    }

    /// Create or update the Copy in `namespace`
    async fn converge(&self, namespace: &str, candidate: &K) -> Result<()> {
        let name = candidate.name_any();
        let mut desired = candidate.clone();
        desired.meta_mut().namespace = Some(namespace.to_string());

        match self.store.get(namespace, &name).await? {
            None => {
                self.store.create(namespace, &desired).await?;
                info!("Created {} {}/{}", K::KIND, namespace, name);
            }
            Some(existing) if sync_annotation(&existing).is_some() => {
                warn!(
                    "{} {}/{} is a sync source itself, not overwriting it",
                    K::KIND,
                    namespace,
                    name
                );
            }
            Some(existing)
                if existing.same_payload(&desired)
                    && recorded_selector(&existing) == recorded_selector(&desired) =>
            {
                debug!("{} {}/{} is up to date", K::KIND, namespace, name);
            }
            Some(existing) => {
                desired.meta_mut().uid = existing.meta().uid.clone();
                desired.meta_mut().resource_version = existing.meta().resource_version.clone();
                self.store.replace(namespace, &desired).await?;
                info!("Updated {} {}/{}", K::KIND, namespace, name);
            }
        }
        Ok(())
    }

    /// Why the Copy described by `provenance` no longer belongs in `namespace`, if it doesn't
    async fn orphan_reason(
        &self,
        provenance: &Provenance,
        namespace: &Namespace,
    ) -> Result<Option<&'static str>> {
        if !provenance.selector.matches(namespace.labels()) {
            return Ok(Some("selector no longer matches"));
        }

        let reason = match self.store.get(&provenance.namespace, &provenance.name).await? {
            None => Some("source is gone"),
            Some(source) if sync_annotation(&source).is_none() => {
                Some("source is no longer annotated")
            }
            Some(_) => None,
        };
        Ok(reason)
    }
}

/// Selector stored in an object's provenance record, if it has a readable one
fn recorded_selector<K: Replicated>(obj: &K) -> Option<Selector> {
    Provenance::read(obj).ok().flatten().map(|p| p.selector)
}

fn partial(key: &str, failed: usize) -> Result<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(SyncError::PartialSync {
            key: key.to_string(),
            failed,
        })
    }
}
