// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types.

pub mod target_sync;

pub use target_sync::{SourceRef, SyncKey, TargetSync, TargetSyncSpec, TargetSyncStatus};
