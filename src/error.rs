// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid resource key: {0}")]
    InvalidKey(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid provenance annotation: {0}")]
    InvalidProvenance(String),

    #[error("{failed} replica operation(s) failed for {key}")]
    PartialSync { key: String, failed: usize },

    #[error("Namespace {namespace} sync failed: {reason}")]
    NamespaceSync { namespace: String, reason: String },

    #[error("Cache for {0} never became ready")]
    CacheNotReady(&'static str),
}

impl SyncError {
    /// True when the API server answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::KubeError(kube::Error::Api(err)) if err.code == 404)
    }

    /// Whether requeueing the key can fix this error.
    /// Malformed keys and annotations only change when an operator edits the object,
    /// which triggers a fresh event anyway.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::KubeError(_) => !self.is_not_found(),
            SyncError::PartialSync { .. } | SyncError::NamespaceSync { .. } => true,
            SyncError::KubeconfigError(_)
            | SyncError::InvalidKey(_)
            | SyncError::InvalidSelector(_)
            | SyncError::InvalidProvenance(_)
            | SyncError::CacheNotReady(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
