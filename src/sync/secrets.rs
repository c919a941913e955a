// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Copying secrets into target namespaces

use crate::constants::{annotations, OPERATOR_NAME};
use crate::error::Result;
use crate::types::SyncKey;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ObjectMeta, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Apply a copy of `secret` into `target_namespace`.
///
/// Uses a forced server-side apply, so repeating the call with the same
/// secret leaves the target unchanged.
#[instrument(
    skip(client, secret, owner),
    fields(
        secret = %format!("{}/{}", secret.namespace().unwrap_or_default(), secret.name_any()),
        target_sync = %owner
    )
)]
pub async fn apply_secret_to_namespace(
    client: &Client,
    secret: &Secret,
    target_namespace: &str,
    owner: &SyncKey,
) -> Result<()> {
    let secret_name = secret.name_any();
    let target_secrets: Api<Secret> = Api::namespaced(client.clone(), target_namespace);
    let new_secret = create_target_secret(secret, target_namespace, owner);

    let pp = PatchParams::apply(OPERATOR_NAME).force();
    target_secrets
        .patch(&secret_name, &pp, &Patch::Apply(&new_secret))
        .await?;

    info!(
        "Synced secret {} into namespace {}",
        secret_name, target_namespace
    );

    Ok(())
}

/// Whether `secret` is a copy written by a sync process
pub fn is_synced_copy(secret: &Secret) -> bool {
    secret.annotations().contains_key(annotations::TARGET_SYNC)
}

/// Create the target secret by cloning the source and recording its origin.
/// Copies are never immutable, so a recreated source can still be applied.
fn create_target_secret(secret: &Secret, target_namespace: &str, owner: &SyncKey) -> Secret {
    let mut target_annotations: BTreeMap<String, String> = secret
        .metadata
        .annotations
        .as_ref()
        .map(|a| {
            a.iter()
                .filter(|(k, _)| !k.starts_with(annotations::PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    target_annotations.insert(annotations::TARGET_SYNC.to_string(), owner.to_string());
    target_annotations.insert(
        annotations::SOURCE.to_string(),
        format!("{}/{}", secret.namespace().unwrap_or_default(), secret.name_any()),
    );

    Secret {
        metadata: ObjectMeta {
            name: secret.metadata.name.clone(),
            namespace: Some(target_namespace.to_string()),
            labels: secret.metadata.labels.clone(),
            annotations: Some(target_annotations),
            ..Default::default()
        },
        data: secret.data.clone(),
        string_data: secret.string_data.clone(),
        type_: secret.type_.clone(),
        immutable: None,
    }
}
