// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by konfig-syncer
pub mod annotations {
    /// Marks a source object for replication. Empty value means every namespace,
    /// `key=value` restricts replication to namespaces carrying that label.
    pub const SYNC: &str = "konfig-syncer";
    /// Provenance record stamped on every copy
    pub const PROVENANCE: &str = "konfig-syncer-metadata";
}

/// The operator name used as field manager on writes
pub const OPERATOR_NAME: &str = "konfig-syncer";

/// Default number of workers per resource kind
pub const DEFAULT_WORKERS: usize = 2;

/// Work queue retry configuration
pub mod queue {
    /// Delay before the first retry of a failed key, in milliseconds
    pub const BASE_RETRY_DELAY_MS: u64 = 5;
    /// Maximum retry delay in seconds (exponential backoff cap)
    pub const MAX_RETRY_DELAY_SECS: u64 = 1000;
}
