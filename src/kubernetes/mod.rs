// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities: client bootstrap, watch caches and object store access.

pub mod client;
pub mod informer;
pub mod store;

pub use client::create_client;
pub use informer::{Informer, Notification};
pub use store::{KubeStore, NamespaceCache, NamespaceLister, ObjectStore};
