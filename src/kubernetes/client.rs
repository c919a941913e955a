// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Source cluster client creation and kubeconfig utilities

use crate::error::{CourierError, Result};
use crate::types::{SourceRef, TargetSync};
use k8s_openapi::api::core::v1::Secret;
use kube::{config::KubeConfigOptions, Api, Client, ResourceExt};
use tracing::{debug, info, instrument};

/// Create a Kubernetes client for the source cluster of a TargetSync.
///
/// Without a `sourceRef` the controller's own client is reused.
#[instrument(skip(local_client, target_sync), fields(target_sync = %target_sync.key()))]
pub async fn create_source_client(local_client: &Client, target_sync: &TargetSync) -> Result<Client> {
    match &target_sync.spec.source_ref {
        None => {
            debug!("No sourceRef set, using the local cluster as source");
            Ok(local_client.clone())
        }
        Some(source_ref) => {
            let namespace = target_sync.namespace().unwrap_or_default();
            let kubeconfig = get_source_kubeconfig(local_client, &namespace, source_ref).await?;
            create_client_from_kubeconfig(&kubeconfig).await
        }
    }
}

/// Read the kubeconfig referenced by a `sourceRef` from the TargetSync namespace
#[instrument(skip(client, source_ref), fields(secret = %source_ref.kubeconfig_secret))]
async fn get_source_kubeconfig(
    client: &Client,
    namespace: &str,
    source_ref: &SourceRef,
) -> Result<String> {
    let secret_name = &source_ref.kubeconfig_secret;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    info!("Getting kubeconfig secret '{}/{}'...", namespace, secret_name);

    let secret = secrets.get(secret_name).await.map_err(|e| {
        CourierError::KubeconfigError(format!(
            "Failed to get kubeconfig secret {}/{}: {}",
            namespace, secret_name, e
        ))
    })?;

    let Some(data) = secret.data.as_ref() else {
        return Err(CourierError::KubeconfigError(format!(
            "Kubeconfig secret {}/{} has no data",
            namespace, secret_name
        )));
    };

    let Some(kubeconfig_data) = data.get(source_ref.key()) else {
        return Err(CourierError::KubeconfigError(format!(
            "Kubeconfig secret {}/{} does not contain '{}' key",
            namespace,
            secret_name,
            source_ref.key()
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        CourierError::KubeconfigError(format!(
            "Failed to decode kubeconfig in secret {}/{}: {}",
            namespace, secret_name, e
        ))
    })
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    use kube::config::Kubeconfig;

    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| CourierError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                CourierError::KubeconfigError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| CourierError::KubeconfigError(format!("Failed to create client: {}", e)))
}
