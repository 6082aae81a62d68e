// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Provenance record stamped on every copy.

use crate::constants::annotations;
use crate::error::{Result, SyncError};
use crate::types::selector::Selector;
use chrono::{DateTime, Utc};
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Where a copy came from and which selector was in effect when it was last written.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Provenance {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "resourceVersion", default)]
    pub resource_version: String,
    #[serde(rename = "label")]
    pub selector: Selector,
    /// Informational only. Older records carry free-form timestamps, so this is not parsed.
    #[serde(rename = "last-update", default)]
    pub last_update: String,
}

impl Provenance {
    /// Record the origin of a copy made from `source` under `selector`
    pub fn of<K: Resource>(source: &K, selector: &Selector, now: DateTime<Utc>) -> Self {
        Self {
            namespace: source.namespace().unwrap_or_default(),
            name: source.name_any(),
            uid: source.uid().unwrap_or_default(),
            resource_version: source.resource_version().unwrap_or_default(),
            selector: selector.clone(),
            last_update: now.to_rfc3339(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SyncError::InvalidProvenance(e.to_string()))
    }

    pub fn decode(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|e| SyncError::InvalidProvenance(format!("{}: {}", value, e)))
    }

    /// Read the provenance annotation of an object.
    /// `Ok(None)` means the object is not a copy.
    pub fn read<K: Resource>(obj: &K) -> Result<Option<Self>> {
        obj.annotations()
            .get(annotations::PROVENANCE)
            .map(|value| Self::decode(value))
            .transpose()
    }

    /// Whether this record points at the object `namespace/name`
    pub fn is_from(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }
}
