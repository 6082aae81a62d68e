// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Replicated resource kinds and object helpers.

use crate::constants::annotations;
use crate::error::{Result, SyncError};
use crate::types::provenance::Provenance;
use crate::types::selector::Selector;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::{api::ObjectMeta, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// A namespaced kind that konfig-syncer replicates.
pub trait Replicated:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Human readable kind, used in logs
    const KIND: &'static str;

    /// Whether both objects carry the same data payload
    fn same_payload(&self, other: &Self) -> bool;
}

impl Replicated for ConfigMap {
    const KIND: &'static str = "ConfigMap";

    fn same_payload(&self, other: &Self) -> bool {
        self.data == other.data && self.binary_data == other.binary_data
    }
}

impl Replicated for Secret {
    const KIND: &'static str = "Secret";

    fn same_payload(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

/// Queue key of an object, `namespace/name`
pub fn object_key<K: Resource>(obj: &K) -> String {
    match obj.namespace() {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, obj.name_any()),
        _ => obj.name_any(),
    }
}

/// Split a queue key into namespace and name. Cluster scoped keys have an empty namespace.
pub fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [name] if !name.is_empty() => Ok(("", *name)),
        [namespace, name] if !name.is_empty() => Ok((*namespace, *name)),
        _ => Err(SyncError::InvalidKey(key.to_string())),
    }
}

/// Raw value of the sync annotation, if the object carries it
pub fn sync_annotation<K: Resource>(obj: &K) -> Option<&str> {
    obj.annotations().get(annotations::SYNC).map(String::as_str)
}

pub fn is_terminating(namespace: &Namespace) -> bool {
    namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Terminating")
}

/// Build the copy of `source` that gets written into other namespaces.
///
/// The copy keeps name, labels and every annotation except the sync annotation, loses all
/// server assigned metadata and gets a fresh provenance record.
pub fn build_copy<K: Replicated>(source: &K, selector: &Selector, now: DateTime<Utc>) -> Result<K> {
    let mut kept = source.annotations().clone();
    kept.remove(annotations::SYNC);
    kept.insert(
        annotations::PROVENANCE.to_string(),
        Provenance::of(source, selector, now).encode()?,
    );

    let labels = source.labels().clone();

    let mut copy = source.clone();
    *copy.meta_mut() = ObjectMeta {
        name: source.meta().name.clone(),
        labels: (!labels.is_empty()).then_some(labels),
        annotations: Some(kept),
        ..Default::default()
    };
    Ok(copy)
}
