// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to the source and target clusters of a sync process.

use crate::error::{CourierError, Result};
use crate::kubernetes::{create_source_client, list_namespaces};
use crate::sync::secrets::apply_secret_to_namespace;
use crate::types::{SyncKey, TargetSync};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use std::sync::Arc;

/// Read access to secrets on a source cluster
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Stream of created or updated secrets. Deletions are not reported.
    fn watch(&self) -> BoxStream<'static, Result<Secret>>;

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
}

/// The cluster secrets are synced into
#[async_trait]
pub trait TargetCluster: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;

    /// Copy `secret` into `namespace`. Must be idempotent.
    async fn sync(&self, secret: &Secret, namespace: &str) -> Result<()>;
}

/// Resolves the clusters a TargetSync reads from and writes to
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn source(&self, target_sync: &TargetSync) -> Result<Arc<dyn SecretSource>>;

    fn target(&self, key: &SyncKey) -> Arc<dyn TargetCluster>;
}

pub struct KubeSecretSource {
    client: Client,
    namespace: Option<String>,
}

impl KubeSecretSource {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn api(&self) -> Api<Secret> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    fn watch(&self) -> BoxStream<'static, Result<Secret>> {
        watcher(self.api(), watcher::Config::default())
            .default_backoff()
            .applied_objects()
            .map_err(CourierError::from)
            .boxed()
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?)
    }
}

pub struct KubeTargetCluster {
    client: Client,
    owner: SyncKey,
}

impl KubeTargetCluster {
    pub fn new(client: Client, owner: SyncKey) -> Self {
        Self { client, owner }
    }
}

#[async_trait]
impl TargetCluster for KubeTargetCluster {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        list_namespaces(&self.client).await
    }

    async fn sync(&self, secret: &Secret, namespace: &str) -> Result<()> {
        apply_secret_to_namespace(&self.client, secret, namespace, &self.owner).await
    }
}

/// Connects to source clusters through `sourceRef` kubeconfigs and uses the
/// local cluster as target
pub struct KubeClusterConnector {
    client: Client,
}

impl KubeClusterConnector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterConnector for KubeClusterConnector {
    async fn source(&self, target_sync: &TargetSync) -> Result<Arc<dyn SecretSource>> {
        let client = create_source_client(&self.client, target_sync)
            .await
            .map_err(|e| {
                CourierError::ConnectError(format!(
                    "source cluster of {}: {}",
                    target_sync.key(),
                    e
                ))
            })?;

        Ok(Arc::new(KubeSecretSource::new(
            client,
            target_sync.spec.source_namespace.clone(),
        )))
    }

    fn target(&self, key: &SyncKey) -> Arc<dyn TargetCluster> {
        Arc::new(KubeTargetCluster::new(self.client.clone(), key.clone()))
    }
}
