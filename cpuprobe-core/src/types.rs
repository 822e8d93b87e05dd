// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Maximum workload name length.
const MAX_NAME_LEN: usize = 64;

/// Validated workload name.
/// Must be non-empty, at most 64 chars, alphanumeric plus `-`, `_`, `/` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkloadName(String);

impl WorkloadName {
    /// Create a new WorkloadName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "workload_name",
                value: name,
                reason: "Workload name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "workload_name",
                value: name.clone(),
                reason: format!(
                    "Workload name too long: {} chars (max {})",
                    name.len(),
                    MAX_NAME_LEN
                ),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        {
            return Err(ConfigurationError::InvalidFieldValue {
                field: "workload_name",
                value: name,
                reason: "Workload name must contain only ASCII alphanumerics, '-', '_', '/' and '.'"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for WorkloadName {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkloadName> for String {
    fn from(name: WorkloadName) -> Self {
        name.0
    }
}

impl AsRef<str> for WorkloadName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
