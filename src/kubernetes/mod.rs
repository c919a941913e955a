// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for source client creation and namespace listing.

pub mod client;
pub mod namespaces;

pub use client::create_source_client;
pub use namespaces::list_namespaces;
