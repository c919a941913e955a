// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! TargetSync reconciler - keeps one sync process running per TargetSync.

use crate::config::Config;
use crate::constants::phase;
use crate::error::{CourierError, Result};
use crate::reconcilers::store::{KubeTargetSyncStore, TargetSyncStore};
use crate::sync::SyncPool;
use crate::types::{TargetSync, TargetSyncStatus};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct TargetSyncReconciler {
    client: Client,
    pool: Arc<SyncPool>,
    store: Arc<dyn TargetSyncStore>,
    config: Config,
}

impl TargetSyncReconciler {
    pub fn new(client: Client, pool: Arc<SyncPool>, config: Config) -> Self {
        let store = Arc::new(KubeTargetSyncStore::new(client.clone()));
        Self {
            client,
            pool,
            store,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let target_syncs: Api<TargetSync> = match &self.config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let pool = self.pool.clone();
        let context = Arc::new(self);

        Controller::new(target_syncs, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled target sync: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        pool.shutdown().await;
        Ok(())
    }
}

async fn reconcile(target_sync: Arc<TargetSync>, ctx: Arc<TargetSyncReconciler>) -> Result<Action> {
    reconcile_target_sync(
        &target_sync,
        ctx.store.as_ref(),
        &ctx.pool,
        ctx.config.resync_interval(),
    )
    .await
}

fn error_policy(
    _target_sync: Arc<TargetSync>,
    error: &CourierError,
    ctx: Arc<TargetSyncReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(ctx.config.requeue_interval())
}

/// Drive the sync pool towards the state described by `target_sync`.
///
/// The finalizer is only released after the sync process has been stopped.
/// Errors leave the status untouched, the next attempt re-derives what to do
/// from the generation and the registry.
#[instrument(skip_all, fields(target_sync = %target_sync.key()))]
pub async fn reconcile_target_sync(
    target_sync: &TargetSync,
    store: &dyn TargetSyncStore,
    pool: &SyncPool,
    resync: Duration,
) -> Result<Action> {
    let key = target_sync.key();

    if target_sync.is_deleting() {
        pool.stop_process(&key).await?;
        if target_sync.has_finalizer() {
            store.remove_finalizer(target_sync).await?;
            info!("Sync process stopped, finalizer removed");
        }
        return Ok(Action::await_change());
    }

    // The finalizer update triggers the next reconciliation, which starts the process
    if !target_sync.has_finalizer() {
        store.add_finalizer(target_sync).await?;
        return Ok(Action::await_change());
    }

    let result = if !pool.has_process(&key).await {
        pool.start_process(target_sync).await
    } else if target_sync.generation() != target_sync.observed_generation() {
        info!(
            "Generation changed from {} to {}, replacing sync process",
            target_sync.observed_generation(),
            target_sync.generation()
        );
        pool.replace_process(target_sync).await
    } else {
        debug!("Sync process up to date");
        return Ok(Action::requeue(resync));
    };

    match result {
        Ok(()) => {
            let status = TargetSyncStatus {
                observed_generation: Some(target_sync.generation()),
                phase: Some(phase::COMPLETED.to_string()),
            };
            store.update_status(target_sync, status).await?;
            Ok(Action::requeue(resync))
        }
        Err(e) if e.is_permanent() => {
            warn!("Not starting sync process: {}", e);
            let status = TargetSyncStatus {
                observed_generation: None,
                phase: Some(format!("{}: {}", phase::INVALID_PATTERN, e)),
            };
            store.update_status(target_sync, status).await?;
            Ok(Action::await_change())
        }
        Err(e) => Err(e),
    }
}
