// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys set on synced secrets
pub mod annotations {
    /// Prefix shared by all Courier annotations
    pub const PREFIX: &str = "courier.dev/";
    /// `namespace/name` of the TargetSync that produced the copy
    pub const TARGET_SYNC: &str = "courier.dev/target-sync";
    /// `namespace/name` of the secret on the source cluster
    pub const SOURCE: &str = "courier.dev/source";
}

/// The operator name used for server-side apply
pub const OPERATOR_NAME: &str = "courier";

/// Finalizer guarding TargetSync deletion until its sync process is stopped
pub const FINALIZER: &str = "courier.dev/target-sync";

/// Default key holding the kubeconfig in a `sourceRef` secret
pub const DEFAULT_KUBECONFIG_KEY: &str = "kubeconfig";

/// Status phases written to TargetSync resources
pub mod phase {
    pub const COMPLETED: &str = "Completed";
    pub const INVALID_PATTERN: &str = "InvalidPattern";
}
