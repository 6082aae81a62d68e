// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Wires informers, classifiers, queues and workers together.

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::kubernetes::{Informer, KubeStore, NamespaceCache, NamespaceLister};
use crate::reconcilers::Worker;
use crate::sync::{
    namespace_needs_sync, Classifier, DeletionTracker, NamespaceSync, Reconcile, Replicator,
    WorkQueue,
};
use crate::types::{object_key, Replicated};
use futures::future::join_all;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use kube::runtime::reflector::Store;
use kube::{Api, Client, Resource};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The konfig-syncer controller.
///
/// Watches ConfigMaps, Secrets and Namespaces cluster wide and keeps the Copies of every
/// annotated Source converged until `shutdown` resolves.
pub struct KonfigSyncer {
    client: Client,
    config: Config,
}

/// A queue and the reconciler its workers feed
struct Pipeline {
    queue: Arc<WorkQueue>,
    reconciler: Arc<dyn Reconcile>,
}

impl KonfigSyncer {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config_map_informer = Informer::<ConfigMap>::new(Api::all(self.client.clone()));
        let secret_informer = Informer::<Secret>::new(Api::all(self.client.clone()));
        let namespace_informer = Informer::<Namespace>::new(Api::all(self.client.clone()));

        let config_map_cache = config_map_informer.store();
        let secret_cache = secret_informer.store();
        let namespace_cache = namespace_informer.store();

        let namespaces: Arc<dyn NamespaceLister> =
            Arc::new(NamespaceCache::new(namespace_cache.clone()));

        let config_map_queue = WorkQueue::new("configmaps");
        let secret_queue = WorkQueue::new("secrets");
        let namespace_queue = WorkQueue::new("namespaces");

        let config_map_tracker = Arc::new(DeletionTracker::new());
        let secret_tracker = Arc::new(DeletionTracker::new());

        let config_maps =
            self.replicator(config_map_cache.clone(), &namespaces, &config_map_tracker);
        let secrets = self.replicator(secret_cache.clone(), &namespaces, &secret_tracker);
        let namespace_sync = Arc::new(NamespaceSync::new(
            namespaces,
            config_maps.clone(),
            secrets.clone(),
        ));

        let informers: Vec<JoinHandle<()>> = vec![
            spawn_classified(
                config_map_informer,
                Classifier::new(config_map_queue.clone(), config_map_tracker),
            ),
            spawn_classified(
                secret_informer,
                Classifier::new(secret_queue.clone(), secret_tracker),
            ),
            {
                let queue = namespace_queue.clone();
                tokio::spawn(namespace_informer.run(move |notification| {
                    if namespace_needs_sync(&notification) {
                        queue.add(&object_key(notification.object()));
                    }
                }))
            },
        ];

        tokio::pin!(shutdown);

        info!("Waiting for caches to sync");
        let ready = async {
            tokio::try_join!(
                wait_for(&config_map_cache, ConfigMap::KIND),
                wait_for(&secret_cache, Secret::KIND),
                wait_for(&namespace_cache, "Namespace"),
            )
        };
        tokio::select! {
            result = ready => {
                if let Err(e) = result {
                    abort_all(&informers);
                    return Err(e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown requested before caches synced");
                abort_all(&informers);
                return Ok(());
            }
        }

        let pipelines = [
            Pipeline {
                queue: config_map_queue,
                reconciler: config_maps,
            },
            Pipeline {
                queue: secret_queue,
                reconciler: secrets,
            },
            Pipeline {
                queue: namespace_queue,
                reconciler: namespace_sync,
            },
        ];

        let mut workers = Vec::new();
        for pipeline in &pipelines {
            for id in 0..self.config.workers {
                let worker = Worker::new(id, pipeline.queue.clone(), pipeline.reconciler.clone());
                workers.push(tokio::spawn(worker.run()));
            }
        }
        info!(
            "Started {} worker(s) for each of {} queues",
            self.config.workers,
            pipelines.len()
        );

        shutdown.await;
        info!("Shutting down, draining in-flight work");

        for pipeline in &pipelines {
            pipeline.queue.shutdown();
        }
        join_all(workers).await;
        abort_all(&informers);

        info!("Shutdown complete");
        Ok(())
    }

    fn replicator<K: Replicated>(
        &self,
        cache: Store<K>,
        namespaces: &Arc<dyn NamespaceLister>,
        tracker: &Arc<DeletionTracker<K>>,
    ) -> Arc<Replicator<K>> {
        Arc::new(Replicator::new(
            Arc::new(KubeStore::new(self.client.clone(), cache)),
            namespaces.clone(),
            tracker.clone(),
        ))
    }
}

fn spawn_classified<K: Replicated>(
    informer: Informer<K>,
    classifier: Classifier<K>,
) -> JoinHandle<()> {
    tokio::spawn(informer.run(move |notification| classifier.handle(notification)))
}

async fn wait_for<K>(cache: &Store<K>, kind: &'static str) -> Result<()>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    cache
        .wait_until_ready()
        .await
        .map_err(|_| SyncError::CacheNotReady(kind))?;
    info!("{} cache synced", kind);
    Ok(())
}

fn abort_all(tasks: &[JoinHandle<()>]) {
    for task in tasks {
        task.abort();
    }
}
