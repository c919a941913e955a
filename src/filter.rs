// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Name filters compiled from TargetSync expressions

use crate::error::{CourierError, Result};
use kube::ResourceExt;
use regex::Regex;

/// A compiled regular expression matched against resource names.
///
/// The expression is evaluated against the whole name, so anchors are
/// honored: `^laas-` matches `laas-test` but not `my-laas-test`.
#[derive(Clone, Debug)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    pub fn new(expression: &str) -> Result<Self> {
        let regex = Regex::new(expression).map_err(|source| CourierError::InvalidPattern {
            expression: expression.to_string(),
            source,
        })?;

        Ok(Self { regex })
    }

    pub fn expression(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn matches_object<K: ResourceExt>(&self, obj: &K) -> bool {
        self.matches(&obj.name_any())
    }
}
