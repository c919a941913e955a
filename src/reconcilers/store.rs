// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Finalizer and status write-back for TargetSync resources.

use crate::constants::{FINALIZER, OPERATOR_NAME};
use crate::error::Result;
use crate::types::{TargetSync, TargetSyncStatus};
use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, instrument};

#[async_trait]
pub trait TargetSyncStore: Send + Sync {
    async fn add_finalizer(&self, target_sync: &TargetSync) -> Result<()>;

    async fn remove_finalizer(&self, target_sync: &TargetSync) -> Result<()>;

    /// Merge `status` into the TargetSync status. `None` fields are left as they are.
    async fn update_status(&self, target_sync: &TargetSync, status: TargetSyncStatus) -> Result<()>;
}

pub struct KubeTargetSyncStore {
    client: Client,
}

impl KubeTargetSyncStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, target_sync: &TargetSync) -> Api<TargetSync> {
        Api::namespaced(
            self.client.clone(),
            &target_sync.namespace().unwrap_or_default(),
        )
    }

    async fn patch_finalizers(&self, target_sync: &TargetSync, finalizers: Vec<String>) -> Result<()> {
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers
            }
        });

        self.api(target_sync)
            .patch(
                &target_sync.name_any(),
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TargetSyncStore for KubeTargetSyncStore {
    #[instrument(skip(self, target_sync), fields(target_sync = %target_sync.key()))]
    async fn add_finalizer(&self, target_sync: &TargetSync) -> Result<()> {
        if target_sync.has_finalizer() {
            return Ok(());
        }

        let mut finalizers = target_sync.finalizers().to_vec();
        finalizers.push(FINALIZER.to_string());
        self.patch_finalizers(target_sync, finalizers).await?;

        debug!("Added finalizer");
        Ok(())
    }

    #[instrument(skip(self, target_sync), fields(target_sync = %target_sync.key()))]
    async fn remove_finalizer(&self, target_sync: &TargetSync) -> Result<()> {
        let finalizers: Vec<String> = target_sync
            .finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(target_sync, finalizers).await?;

        debug!("Removed finalizer");
        Ok(())
    }

    #[instrument(skip(self, target_sync, status), fields(target_sync = %target_sync.key()))]
    async fn update_status(&self, target_sync: &TargetSync, status: TargetSyncStatus) -> Result<()> {
        let patch = serde_json::json!({ "status": status });

        self.api(target_sync)
            .patch_status(
                &target_sync.name_any(),
                &PatchParams::apply(OPERATOR_NAME),
                &Patch::Merge(&patch),
            )
            .await?;

        debug!(
            "Updated status: observedGeneration={:?}, phase={:?}",
            status.observed_generation, status.phase
        );
        Ok(())
    }
}
