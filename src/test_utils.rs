// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API and in-memory object stores.

use crate::constants::annotations;
use crate::error::{Result, SyncError};
use crate::kubernetes::{NamespaceLister, ObjectStore};
use crate::types::Replicated;
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, NamespaceStatus, Secret};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::runtime::reflector::{store::Writer, Store};
use kube::runtime::watcher;
use kube::error::ErrorResponse;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for requests with `method` matching the exact path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, status_json(404, "NotFound", "not found")));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A reflector cache holding `objects`, frozen: writes through the API never reach it
pub fn cache_of<K>(objects: Vec<K>) -> Store<K>
where
    K: kube::Resource<DynamicType = ()> + Clone + 'static,
{
    let mut writer = Writer::default();
    for obj in objects {
        writer.apply_watcher_event(&watcher::Event::Apply(obj));
    }
    writer.as_reader()
}

/// Create a mock ConfigMap JSON response
pub fn config_map_json(namespace: &str, name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid",
            "resourceVersion": "1"
        }
    })
    .to_string()
}

/// Create a Status JSON response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// An API error as the Kubernetes client reports it
pub fn api_error(code: u16, reason: &str) -> SyncError {
    SyncError::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: reason.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn source_meta(namespace: &str, name: &str, sync: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        annotations: sync.map(|s| BTreeMap::from([(annotations::SYNC.to_string(), s.to_string())])),
        ..Default::default()
    }
}

pub fn namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(string_map(labels)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A ConfigMap, optionally carrying the sync annotation with the given value
pub fn config_map(
    namespace: &str,
    name: &str,
    sync: Option<&str>,
    data: &[(&str, &str)],
) -> ConfigMap {
    ConfigMap {
        metadata: source_meta(namespace, name, sync),
        data: Some(string_map(data)),
        ..Default::default()
    }
}

/// An Opaque Secret, optionally carrying the sync annotation with the given value
pub fn secret(namespace: &str, name: &str, sync: Option<&str>, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: source_meta(namespace, name, sync),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// In-memory [`ObjectStore`] that counts writes and can fail them per namespace.
pub struct FakeStore<K> {
    objects: Mutex<BTreeMap<(String, String), K>>,
    failing: Mutex<HashSet<String>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

impl<K: Replicated> FakeStore<K> {
    pub fn new(objects: Vec<K>) -> Arc<Self> {
        let store = Self {
            objects: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(HashSet::new()),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        };
        for obj in objects {
            store.insert(obj);
        }
        Arc::new(store)
    }

    /// Put an object in place without counting it as a write
    pub fn insert(&self, obj: K) {
        let key = (obj.namespace().unwrap_or_default(), obj.name_any());
        self.objects.lock().unwrap().insert(key, obj);
    }

    pub fn object(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Namespaces holding an object called `name`
    pub fn namespaces_of(&self, name: &str) -> BTreeSet<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(_, n)| n == name)
            .map(|(ns, _)| ns.clone())
            .collect()
    }

    pub fn fail_writes_in(&self, namespace: &str) {
        self.failing.lock().unwrap().insert(namespace.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.creates() + self.updates() + self.deletes()
    }

    fn check_writable(&self, namespace: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(namespace) {
            return Err(api_error(500, "InternalError"));
        }
        Ok(())
    }
}

#[async_trait]
impl<K: Replicated> ObjectStore<K> for FakeStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.object(namespace, name))
    }

    async fn list(&self) -> Result<Vec<K>> {
        Ok(self.objects.lock().unwrap().values().cloned().collect())
    }

    async fn list_in(&self, namespace: &str) -> Result<Vec<K>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(&self, namespace: &str, obj: &K) -> Result<K> {
        self.check_writable(namespace)?;
        let key = (namespace.to_string(), obj.name_any());
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }

        let mut created = obj.clone();
        created.meta_mut().namespace = Some(namespace.to_string());
        created.meta_mut().uid = Some(format!("uid-{}-{}", namespace, key.1));
        created.meta_mut().resource_version = Some("1".to_string());
        objects.insert(key, created.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn replace(&self, namespace: &str, obj: &K) -> Result<K> {
        self.check_writable(namespace)?;
        let key = (namespace.to_string(), obj.name_any());
        let mut objects = self.objects.lock().unwrap();
        let Some(existing) = objects.get(&key) else {
            return Err(api_error(404, "NotFound"));
        };
        if existing.resource_version() != obj.resource_version() {
            return Err(api_error(409, "Conflict"));
        }

        let version: u64 = obj
            .resource_version()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut replaced = obj.clone();
        replaced.meta_mut().namespace = Some(namespace.to_string());
        replaced.meta_mut().resource_version = Some((version + 1).to_string());
        objects.insert(key, replaced.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(replaced)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.check_writable(namespace)?;
        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        if removed.is_some() {
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// In-memory [`NamespaceLister`]
pub struct FakeNamespaces {
    namespaces: Mutex<Vec<Namespace>>,
}

impl FakeNamespaces {
    pub fn new(namespaces: Vec<Namespace>) -> Arc<Self> {
        Arc::new(Self {
            namespaces: Mutex::new(namespaces),
        })
    }

    pub fn set_labels(&self, name: &str, labels: &[(&str, &str)]) {
        for ns in self.namespaces.lock().unwrap().iter_mut() {
            if ns.name_any() == name {
                ns.metadata.labels = Some(string_map(labels));
            }
        }
    }

    pub fn set_terminating(&self, name: &str) {
        for ns in self.namespaces.lock().unwrap().iter_mut() {
            if ns.name_any() == name {
                ns.status = Some(NamespaceStatus {
                    phase: Some("Terminating".to_string()),
                    ..Default::default()
                });
            }
        }
    }
}

#[async_trait]
impl NamespaceLister for FakeNamespaces {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        Ok(self
            .namespaces
            .lock()
            .unwrap()
            .iter()
            .find(|ns| ns.name_any() == name)
            .cloned())
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self.namespaces.lock().unwrap().clone())
    }
}
