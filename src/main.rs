// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use courier::config::Config;
use courier::reconcilers::TargetSyncReconciler;
use courier::sync::{KubeClusterConnector, SyncPool, SyncSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Courier operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={:?}, retry_limit={}",
        config.watch_namespace, config.retry_limit
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // The pool owns all sync processes, the reconciler drives it
    let connector = Arc::new(KubeClusterConnector::new(client.clone()));
    let pool = Arc::new(SyncPool::new(connector, SyncSettings::from(&config)));
    let reconciler = TargetSyncReconciler::new(client, pool, config);

    info!("Starting TargetSync reconciler...");
    reconciler.run().await?;

    warn!("TargetSync reconciler stopped");
    Ok(())
}
