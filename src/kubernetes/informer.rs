// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch a resource kind into a local cache and report changes as old/new pairs.

use futures::StreamExt;
use kube::{
    runtime::{
        reflector::{store::Writer, ObjectRef, Store},
        WatchStreamExt,
    },
    Api, Resource,
};
use kube_runtime::watcher::{self, Config as WatcherConfig, Event};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt::Debug;
use tracing::{debug, warn};

/// A change to a watched object, delivered after the cache has been updated.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<K> {
    Added(K),
    Updated { old: K, new: K },
    Deleted(K),
}

impl<K> Notification<K> {
    /// The object as it is now, or as it was when deleted
    pub fn object(&self) -> &K {
        match self {
            Notification::Added(obj) | Notification::Deleted(obj) => obj,
            Notification::Updated { new, .. } => new,
        }
    }

    /// The last state before this change, if there was one
    pub fn into_old(self) -> Option<K> {
        match self {
            Notification::Added(_) => None,
            Notification::Updated { old, .. } => Some(old),
            Notification::Deleted(obj) => Some(obj),
        }
    }
}

/// Keeps a reflector cache of one kind and turns raw watch events into [`Notification`]s.
pub struct Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    api: Api<K>,
    writer: Writer<K>,
    /// Objects seen since the current relist started
    relisted: HashSet<ObjectRef<K>>,
}

impl<K> Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    pub fn new(api: Api<K>) -> Self {
        Self {
            api,
            writer: Writer::default(),
            relisted: HashSet::new(),
        }
    }

    /// Read handle on the cache. Becomes ready after the first complete listing.
    pub fn store(&self) -> Store<K> {
        self.writer.as_reader()
    }

    /// Watch forever, calling `handler` for every change
    pub async fn run<F>(mut self, mut handler: F)
    where
        F: FnMut(Notification<K>) + Send,
    {
        let mut events = watcher::watcher(self.api.clone(), WatcherConfig::default())
            .default_backoff()
            .boxed();

        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    for notification in self.apply(event) {
                        handler(notification);
                    }
                }
                Err(e) => warn!("Watch error, backing off: {}", e),
            }
        }

        warn!("Watch stream ended");
    }

    /// Diff the event against the cache, then apply it.
    fn apply(&mut self, event: Event<K>) -> Vec<Notification<K>> {
        let reader = self.writer.as_reader();
        let notifications = match &event {
            Event::Apply(obj) => vec![self.diff(&reader, obj)],
            Event::Delete(obj) => vec![Notification::Deleted(obj.clone())],
            Event::Init => {
                debug!("Relist started");
                self.relisted.clear();
                vec![]
            }
            Event::InitApply(obj) => {
                self.relisted.insert(ObjectRef::from_obj(obj));
                vec![self.diff(&reader, obj)]
            }
            Event::InitDone => {
                // Anything cached but missing from the relist was deleted while we were not watching
                let gone = reader
                    .state()
                    .into_iter()
                    .filter(|obj| !self.relisted.contains(&ObjectRef::from_obj(obj.as_ref())))
                    .map(|obj| Notification::Deleted(obj.as_ref().clone()))
                    .collect();
                self.relisted.clear();
                gone
            }
        };

        self.writer.apply_watcher_event(&event);
        notifications
    }

    fn diff(&self, reader: &Store<K>, obj: &K) -> Notification<K> {
        match reader.get(&ObjectRef::from_obj(obj)) {
            Some(old) => Notification::Updated {
                old: old.as_ref().clone(),
                new: obj.clone(),
            },
            None => Notification::Added(obj.clone()),
        }
    }
}
