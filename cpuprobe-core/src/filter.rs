// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Workload selection by name.

use std::fmt;

use regex::Regex;

use crate::error::ConfigurationError;

/// Which registered workloads a run should execute.
#[derive(Debug, Clone, Default)]
pub enum WorkloadFilter {
    #[default]
    All,
    /// Name contains this string.
    Substring(String),
    /// Name matches this regular expression.
    Pattern(Regex),
}

impl WorkloadFilter {
    pub fn substring(needle: impl Into<String>) -> Self {
        Self::Substring(needle.into())
    }

    /// Compile a regex filter.
    pub fn regex(pattern: &str) -> Result<Self, ConfigurationError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| ConfigurationError::InvalidFilter {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    /// Build from CLI input: no filter, a substring, or a regex.
    pub fn parse(filter: Option<&str>, as_regex: bool) -> Result<Self, ConfigurationError> {
        match filter {
            None => Ok(Self::All),
            Some(f) if as_regex => Self::regex(f),
            Some(f) => Ok(Self::substring(f)),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            WorkloadFilter::All => true,
            WorkloadFilter::Substring(needle) => name.contains(needle.as_str()),
            WorkloadFilter::Pattern(re) => re.is_match(name),
        }
    }
}

impl fmt::Display for WorkloadFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadFilter::All => write!(f, "*"),
            WorkloadFilter::Substring(needle) => write!(f, "{}", needle),
            WorkloadFilter::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}
