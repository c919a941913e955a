// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only watch TargetSync resources in this namespace (all namespaces if unset)
    pub watch_namespace: Option<String>,
    /// How often a failed secret event is retried before it is dropped
    pub retry_limit: u32,
    pub retry_base_secs: u64,
    pub retry_max_secs: u64,
    /// Requeue delay after a failed TargetSync reconciliation
    pub requeue_secs: u64,
    /// Interval at which healthy TargetSyncs are re-checked for a missing sync process
    pub resync_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            retry_limit: 5,
            retry_base_secs: 2,
            retry_max_secs: 60,
            requeue_secs: 60,
            resync_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let watch_namespace = env::var("WATCH_NAMESPACE").ok().filter(|ns| !ns.is_empty());

        Ok(Config {
            watch_namespace,
            retry_limit: parse_var("SYNC_RETRY_LIMIT", defaults.retry_limit)?,
            retry_base_secs: parse_var("SYNC_RETRY_BASE_SECS", defaults.retry_base_secs)?,
            retry_max_secs: parse_var("SYNC_RETRY_MAX_SECS", defaults.retry_max_secs)?,
            requeue_secs: parse_var("RECONCILE_REQUEUE_SECS", defaults.requeue_secs)?,
            resync_secs: parse_var("RESYNC_SECS", defaults.resync_secs)?,
        })
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_secs)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
