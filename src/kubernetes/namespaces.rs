// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace listing on the target cluster

use crate::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::ListParams, Api, Client};
use tracing::{debug, instrument};

/// List all namespaces visible to the client.
///
/// This is a point-in-time snapshot, the API gives no ordering guarantee.
#[instrument(skip(client))]
pub async fn list_namespaces(client: &Client) -> Result<Vec<Namespace>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespace_list = namespaces.list(&ListParams::default()).await?;

    debug!("Listed {} namespaces", namespace_list.items.len());
    Ok(namespace_list.items)
}
