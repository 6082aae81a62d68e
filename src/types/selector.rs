// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace selector carried in the sync annotation.

use crate::error::SyncError;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Which namespaces a source object is replicated to.
///
/// Parsed from the sync annotation value: the empty string selects every namespace,
/// a single `key=value` pair selects namespaces carrying exactly that label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    #[default]
    All,
    Label { key: String, value: String },
}

impl Selector {
    /// Check a namespace's label set against this selector
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::All => true,
            Selector::Label { key, value } => labels.get(key) == Some(value),
        }
    }

    /// Names of the namespaces this selector currently matches
    pub fn resolve<'a, I>(&self, namespaces: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a Namespace>,
    {
        namespaces
            .into_iter()
            .filter(|ns| self.matches(ns.labels()))
            .map(|ns| ns.name_any())
            .collect()
    }
}

impl FromStr for Selector {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Selector::All);
        }

        match s.split_once('=') {
            Some((key, value)) if !value.contains('=') => Ok(Selector::Label {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(SyncError::InvalidSelector(format!(
                "'{}' is not a single key=value pair",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Selector {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => Ok(()),
            Selector::Label { key, value } => write!(f, "{}={}", key, value),
        }
    }
}
