// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Registry of running sync processes, one per TargetSync.

use crate::error::{CourierError, Result};
use crate::filter::NameFilter;
use crate::sync::cluster::ClusterConnector;
use crate::sync::process::{ExitReason, SyncProcess, SyncSettings};
use crate::types::{SyncKey, TargetSync};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Registry entry of a running sync process
struct ProcessHandle {
    /// Distinguishes a process from a later replacement under the same key
    instance: u64,
    cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<SyncKey, ProcessHandle>>>;

/// Starts, replaces and stops sync processes.
///
/// Every registry access goes through a single lock, so concurrent
/// reconciliations never register two processes for the same TargetSync.
pub struct SyncPool {
    connector: Arc<dyn ClusterConnector>,
    settings: SyncSettings,
    processes: Registry,
    next_instance: AtomicU64,
    root: CancellationToken,
}

impl SyncPool {
    pub fn new(connector: Arc<dyn ClusterConnector>, settings: SyncSettings) -> Self {
        Self {
            connector,
            settings,
            processes: Arc::new(Mutex::new(HashMap::new())),
            next_instance: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    pub async fn has_process(&self, key: &SyncKey) -> bool {
        self.processes.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.processes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.processes.lock().await.is_empty()
    }

    /// Sorted keys of all running processes
    pub async fn keys(&self) -> Vec<SyncKey> {
        let mut keys: Vec<SyncKey> = self.processes.lock().await.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Start a sync process for `target_sync` in the background.
    ///
    /// Fails if the expressions do not compile, the source cluster cannot be
    /// reached, or a process for the same TargetSync is already registered.
    #[instrument(skip(self, target_sync), fields(target_sync = %target_sync.key()))]
    pub async fn start_process(&self, target_sync: &TargetSync) -> Result<()> {
        let filters = compile_filters(target_sync)?;
        self.spawn_process(target_sync, filters).await
    }

    async fn spawn_process(
        &self,
        target_sync: &TargetSync,
        (namespace_filter, secret_filter): (NameFilter, NameFilter),
    ) -> Result<()> {
        let key = target_sync.key();
        let source = self.connector.source(target_sync).await?;
        let target = self.connector.target(&key);
        let process = SyncProcess::new(
            key.clone(),
            source,
            target,
            namespace_filter,
            secret_filter,
            self.settings.clone(),
        );

        let mut processes = self.processes.lock().await;
        if processes.contains_key(&key) {
            return Err(CourierError::RegistryInvariant(format!(
                "a sync process for {} is already running",
                key
            )));
        }

        let instance = self.next_instance.fetch_add(1, Ordering::SeqCst);
        let cancel = self.root.child_token();
        processes.insert(
            key.clone(),
            ProcessHandle {
                instance,
                cancel: cancel.clone(),
            },
        );

        let registry = Arc::clone(&self.processes);
        tokio::spawn(async move {
            let reason = process.run(cancel).await;
            deregister(&registry, &key, instance, reason).await;
        });

        info!(generation = target_sync.generation(), "Started sync process");
        Ok(())
    }

    /// Cancel the process of `key` and forget it. Does not wait for the
    /// process to finish. Stopping an unknown key is a no-op.
    #[instrument(skip(self))]
    pub async fn stop_process(&self, key: &SyncKey) -> Result<()> {
        match self.processes.lock().await.remove(key) {
            Some(handle) => {
                info!("Stopping sync process");
                handle.cancel.cancel();
            }
            None => debug!("Sync process already gone"),
        }
        Ok(())
    }

    /// Restart the process of `target_sync` with its current spec.
    ///
    /// The expressions are compiled first, a spec with an invalid expression
    /// leaves the running process alone.
    pub async fn replace_process(&self, target_sync: &TargetSync) -> Result<()> {
        let filters = compile_filters(target_sync)?;
        self.stop_process(&target_sync.key()).await?;
        self.spawn_process(target_sync, filters).await
    }

    /// Stop every running process
    pub async fn shutdown(&self) {
        let mut processes = self.processes.lock().await;
        info!("Stopping {} sync processes", processes.len());
        processes.clear();
        self.root.cancel();
    }
}

fn compile_filters(target_sync: &TargetSync) -> Result<(NameFilter, NameFilter)> {
    Ok((
        NameFilter::new(&target_sync.spec.namespace_expression)?,
        NameFilter::new(&target_sync.spec.secret_name_expression)?,
    ))
}

/// Remove a finished process from the registry, unless it was already
/// replaced by a newer instance.
async fn deregister(registry: &Registry, key: &SyncKey, instance: u64, reason: ExitReason) {
    let mut processes = registry.lock().await;
    if processes.get(key).is_some_and(|h| h.instance == instance) {
        processes.remove(key);
        if reason == ExitReason::StreamEnded {
            warn!(
                target_sync = %key,
                "Sync process ended on its own, it will be restarted on the next reconciliation"
            );
        }
    }
}
