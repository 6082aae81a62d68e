// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object store access: reads come from the informer caches, writes go to the API server.

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::types::Replicated;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{DeleteParams, PostParams},
    runtime::reflector::{ObjectRef, Store},
    Api, Client, ResourceExt,
};
use tracing::{debug, instrument};

/// CRUD access to one replicated kind across all namespaces.
#[async_trait]
pub trait ObjectStore<K: Replicated>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Every object of this kind in the cluster
    async fn list(&self) -> Result<Vec<K>>;

    async fn list_in(&self, namespace: &str) -> Result<Vec<K>>;

    async fn create(&self, namespace: &str, obj: &K) -> Result<K>;

    /// Replace an existing object. `obj` must carry the target's resource version.
    async fn replace(&self, namespace: &str, obj: &K) -> Result<K>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Read access to namespaces and their labels.
#[async_trait]
pub trait NamespaceLister: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;
}

/// [`ObjectStore`] backed by a reflector cache and the Kubernetes API
pub struct KubeStore<K: Replicated> {
    client: Client,
    cache: Store<K>,
}

impl<K: Replicated> KubeStore<K> {
    pub fn new(client: Client, cache: Store<K>) -> Self {
        Self { client, cache }
    }

    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl<K: Replicated> ObjectStore<K> for KubeStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let key = ObjectRef::new(name).within(namespace);
        Ok(self.cache.get(&key).map(|obj| obj.as_ref().clone()))
    }

    async fn list(&self) -> Result<Vec<K>> {
        Ok(self
            .cache
            .state()
            .iter()
            .map(|obj| obj.as_ref().clone())
            .collect())
    }

    async fn list_in(&self, namespace: &str) -> Result<Vec<K>> {
        Ok(self
            .cache
            .state()
            .iter()
            .filter(|obj| obj.namespace().as_deref() == Some(namespace))
            .map(|obj| obj.as_ref().clone())
            .collect())
    }

    #[instrument(skip(self, obj), fields(kind = K::KIND, name = %obj.name_any()))]
    async fn create(&self, namespace: &str, obj: &K) -> Result<K> {
        Ok(self.api(namespace).create(&post_params(), obj).await?)
    }

    #[instrument(skip(self, obj), fields(kind = K::KIND, name = %obj.name_any()))]
    async fn replace(&self, namespace: &str, obj: &K) -> Result<K> {
        Ok(self
            .api(namespace)
            .replace(&obj.name_any(), &post_params(), obj)
            .await?)
    }

    #[instrument(skip(self), fields(kind = K::KIND))]
    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} {}/{} already gone", K::KIND, namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// [`NamespaceLister`] backed by a reflector cache
pub struct NamespaceCache {
    cache: Store<Namespace>,
}

impl NamespaceCache {
    pub fn new(cache: Store<Namespace>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl NamespaceLister for NamespaceCache {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        Ok(self
            .cache
            .get(&ObjectRef::new(name))
            .map(|ns| ns.as_ref().clone()))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self
            .cache
            .state()
            .iter()
            .map(|ns| ns.as_ref().clone())
            .collect())
    }
}
