// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Destination side reconciliation: react to namespaces appearing or being relabeled.

use crate::error::{Result, SyncError};
use crate::kubernetes::NamespaceLister;
use crate::sync::replicator::Replicator;
use crate::types::{is_terminating, split_key};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Converges ConfigMap and Secret Copies for a single namespace
pub struct NamespaceSync {
    namespaces: Arc<dyn NamespaceLister>,
    config_maps: Arc<Replicator<ConfigMap>>,
    secrets: Arc<Replicator<Secret>>,
}

impl NamespaceSync {
    pub fn new(
        namespaces: Arc<dyn NamespaceLister>,
        config_maps: Arc<Replicator<ConfigMap>>,
        secrets: Arc<Replicator<Secret>>,
    ) -> Self {
        Self {
            namespaces,
            config_maps,
            secrets,
        }
    }

    /// Run both kinds concurrently against the namespace at `key` and wait for both.
    #[instrument(skip(self))]
    pub async fn sync(&self, key: &str) -> Result<()> {
        let (_, name) = split_key(key)?;

        let Some(namespace) = self.namespaces.get_namespace(name).await? else {
            debug!("Namespace {} is gone, nothing to sync", name);
            return Ok(());
        };
        if is_terminating(&namespace) {
            debug!("Namespace {} is terminating, skipping", name);
            return Ok(());
        }

        let (config_maps, secrets) = tokio::join!(
            self.config_maps.sync_to_namespace(&namespace),
            self.secrets.sync_to_namespace(&namespace)
        );

        let failures: Vec<String> = [("ConfigMaps", config_maps), ("Secrets", secrets)]
            .into_iter()
            .filter_map(|(kind, result)| result.err().map(|e| format!("{}: {}", kind, e)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::NamespaceSync {
                namespace: name.to_string(),
                reason: failures.join("; "),
            })
        }
    }
}
