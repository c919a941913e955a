// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-TargetSync watch loop: source secret events fanned out to matching
//! target namespaces.

use crate::config::Config;
use crate::error::{CourierError, Result};
use crate::filter::NameFilter;
use crate::sync::cluster::{SecretSource, TargetCluster};
use crate::sync::secrets::is_synced_copy;
use crate::types::SyncKey;
use futures::stream::BoxStream;
use futures::{future, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Retry behaviour for secret events whose fan-out failed
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub retry_limit: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            retry_limit: config.retry_limit,
            retry_base: Duration::from_secs(config.retry_base_secs),
            retry_max: Duration::from_secs(config.retry_max_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Why a sync process stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    /// The source event stream ended without being cancelled
    StreamEnded,
}

pub struct SyncProcess {
    key: SyncKey,
    source: Arc<dyn SecretSource>,
    target: Arc<dyn TargetCluster>,
    namespace_filter: NameFilter,
    secret_filter: NameFilter,
    settings: SyncSettings,
    state: ProcessState,
}

impl SyncProcess {
    pub fn new(
        key: SyncKey,
        source: Arc<dyn SecretSource>,
        target: Arc<dyn TargetCluster>,
        namespace_filter: NameFilter,
        secret_filter: NameFilter,
        settings: SyncSettings,
    ) -> Self {
        Self {
            key,
            source,
            target,
            namespace_filter,
            secret_filter,
            settings,
            state: ProcessState::Starting,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    fn transition(&mut self, next: ProcessState) {
        debug!(target_sync = %self.key, "Sync process {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Subscribe to source secret events. Secrets not matching the secret
    /// name filter are dropped here and never reach the event loop, as are
    /// copies written by any sync process (source and target may be the
    /// same cluster).
    fn subscribe(&self) -> BoxStream<'static, Result<Secret>> {
        let filter = self.secret_filter.clone();
        self.source
            .watch()
            .try_filter(move |secret| {
                future::ready(!is_synced_copy(secret) && filter.matches_object(secret))
            })
            .boxed()
    }

    /// Copy `secret` into every matching target namespace.
    ///
    /// Stops at the first failing namespace. No new copy is started once
    /// `cancel` fires. Returns the number of namespaces synced.
    #[instrument(
        skip(self, secret, cancel),
        fields(
            target_sync = %self.key,
            secret = %format!("{}/{}", secret.namespace().unwrap_or_default(), secret.name_any())
        )
    )]
    pub async fn process_event(&self, secret: &Secret, cancel: &CancellationToken) -> Result<usize> {
        let namespaces = self.target.list_namespaces().await?;
        let mut synced = 0;

        for namespace in namespaces
            .iter()
            .filter(|ns| self.namespace_filter.matches_object(*ns))
        {
            if cancel.is_cancelled() {
                debug!("Cancelled, skipping remaining namespaces");
                break;
            }

            let name = namespace.name_any();
            self.target
                .sync(secret, &name)
                .await
                .map_err(|e| CourierError::SyncError {
                    namespace: name.clone(),
                    source: Box::new(e),
                })?;
            synced += 1;
        }

        Ok(synced)
    }

    /// Run until cancelled or until the source stream ends.
    pub async fn run(mut self, cancel: CancellationToken) -> ExitReason {
        info!(
            target_sync = %self.key,
            "Starting sync process (namespaces: '{}', secrets: '{}')",
            self.namespace_filter.expression(),
            self.secret_filter.expression()
        );

        let mut events = self.subscribe();
        self.transition(ProcessState::Running);

        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ExitReason::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(secret)) => self.handle_secret(secret, &cancel).await,
                Some(Err(e)) => warn!(target_sync = %self.key, "Source watch error: {}", e),
                None => break ExitReason::StreamEnded,
            }
        };

        self.transition(ProcessState::Stopping);
        drop(events);
        self.transition(ProcessState::Stopped);

        match reason {
            ExitReason::Cancelled => info!(target_sync = %self.key, "Sync process stopped"),
            ExitReason::StreamEnded => {
                warn!(target_sync = %self.key, "Source event stream ended, sync process stopped")
            }
        }
        reason
    }

    /// Process one event, retrying with backoff. The secret is re-read from
    /// the source before every retry.
    async fn handle_secret(&self, mut secret: Secret, cancel: &CancellationToken) {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_default();
        let mut delay = self.settings.retry_base;
        let mut attempt = 0;

        loop {
            match self.process_event(&secret, cancel).await {
                Ok(synced) => {
                    debug!(
                        target_sync = %self.key,
                        "Secret {}/{} synced into {} namespaces",
                        namespace, name, synced
                    );
                    return;
                }
                Err(e) if attempt >= self.settings.retry_limit => {
                    error!(
                        target_sync = %self.key,
                        "Giving up on secret {}/{} after {} retries: {}",
                        namespace, name, attempt, e
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        target_sync = %self.key,
                        "Failed to sync secret {}/{}, retrying in {:?}: {}",
                        namespace, name, delay, e
                    );
                }
            }

            attempt += 1;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(delay) => {}
            }
            delay = (delay * 2).min(self.settings.retry_max);

            match self.source.get(&namespace, &name).await {
                Ok(Some(latest)) => secret = latest,
                Ok(None) => {
                    info!(
                        target_sync = %self.key,
                        "Secret {}/{} no longer exists on the source, dropping event",
                        namespace, name
                    );
                    return;
                }
                Err(e) => warn!(
                    target_sync = %self.key,
                    "Failed to re-read secret {}/{}, retrying with last known version: {}",
                    namespace, name, e
                ),
            }
        }
    }
}
