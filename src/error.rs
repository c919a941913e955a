// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Watch error: {0}")]
    WatchError(#[from] kube::runtime::watcher::Error),

    #[error("Invalid expression '{expression}': {source}")]
    InvalidPattern {
        expression: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Failed to connect to cluster: {0}")]
    ConnectError(String),

    #[error("Secret sync to namespace {namespace} failed: {source}")]
    SyncError {
        namespace: String,
        #[source]
        source: Box<CourierError>,
    },

    #[error("Sync process registry invariant violated: {0}")]
    RegistryInvariant(String),
}

impl CourierError {
    /// Errors that will not go away by retrying with the same TargetSync spec
    pub fn is_permanent(&self) -> bool {
        matches!(self, CourierError::InvalidPattern { .. })
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
