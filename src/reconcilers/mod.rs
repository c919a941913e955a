// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod store;
pub mod target_sync;

pub use store::{KubeTargetSyncStore, TargetSyncStore};
pub use target_sync::{reconcile_target_sync, TargetSyncReconciler};
