//! Custom error types for cpuprobe.
//!
//! Explicit enum error types throughout the library. Workload-level errors are
//! caught at the per-workload boundary and turned into a `Failed` report;
//! configuration and registration errors abort before any measurement.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::reporter::ReporterError;
use crate::types::WorkloadName;

/// Top-level error type for the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    // =========================================================================
    // Registration Errors
    // =========================================================================
    #[error("Workload already registered: {0}")]
    DuplicateName(WorkloadName),

    // =========================================================================
    // Configuration Errors - Fail-Fast Before Measurement
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // =========================================================================
    // Report Sink Errors
    // =========================================================================
    #[error("Report error: {0}")]
    Report(#[from] ReporterError),
}

/// Invalid command-line or file configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    #[error("Invalid workload filter '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },

    #[error("No workloads matched filter '{filter}'")]
    NoWorkloadsMatched { filter: String },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a single workload. Never abort the overall run.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Calibration failed: single invocation took {elapsed:?}, sanity bound is {limit:?}")]
    Calibration { elapsed: Duration, limit: Duration },

    #[error("Setup failed: {reason}")]
    Setup { reason: String },

    #[error("Workload runtime error: {reason}")]
    Runtime { reason: String },

    #[error("Workload panicked: {message}")]
    Panicked { message: String },

    #[error("Latency recorder error: {reason}")]
    Recorder { reason: String },
}

impl WorkloadError {
    /// Shorthand for a runtime failure raised from inside a workload.
    pub fn runtime(reason: impl Into<String>) -> Self {
        Self::Runtime {
            reason: reason.into(),
        }
    }

    /// Shorthand for a failure while building workload inputs.
    pub fn setup(reason: impl Into<String>) -> Self {
        Self::Setup {
            reason: reason.into(),
        }
    }
}

/// Core pinning failures. Logged and otherwise ignored.
#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("Core pinning is not supported on this platform")]
    Unsupported,

    #[error("CPU {core} is not online (online: {online:?})")]
    CoreOffline { core: usize, online: Vec<usize> },

    #[error("sched_setaffinity failed for CPU {core}: {reason}")]
    Syscall { core: usize, reason: String },

    #[error("Restoring the previous CPU mask failed: {reason}")]
    Restore { reason: String },
}

/// Result type alias using HarnessError.
pub type HarnessResult<T> = Result<T, HarnessError>;
