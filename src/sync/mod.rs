// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sync processes and the pool that runs them.

pub mod cluster;
pub mod pool;
pub mod process;
pub mod secrets;

pub use cluster::{
    ClusterConnector, KubeClusterConnector, KubeSecretSource, KubeTargetCluster, SecretSource,
    TargetCluster,
};
pub use pool::SyncPool;
pub use process::{ExitReason, ProcessState, SyncProcess, SyncSettings};
pub use secrets::apply_secret_to_namespace;
