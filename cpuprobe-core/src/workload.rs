// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The unit of benchmarked work.

use serde::{Deserialize, Serialize};

use crate::barrier::Barrier;
use crate::error::WorkloadError;

/// Per-iteration auxiliary counters used for throughput figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Bytes touched by one invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_per_iteration: Option<u64>,
    /// Logical items processed by one invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_iteration: Option<u64>,
}

impl Counters {
    pub fn bytes(bytes_per_iteration: u64) -> Self {
        Self {
            bytes_per_iteration: Some(bytes_per_iteration),
            items_per_iteration: None,
        }
    }

    pub fn with_items(mut self, items_per_iteration: u64) -> Self {
        self.items_per_iteration = Some(items_per_iteration);
        self
    }
}

/// A named unit of benchmarked work.
///
/// `setup` runs once, untimed, before warm-up. `iterate` performs exactly one
/// unit of work and returns a value the harness passes through the barrier so
/// the computation cannot be proven dead. Memory written by `iterate` should be
/// handed to [`Barrier::escape`] (or `observe`) by the workload itself.
pub trait Workload {
    /// Build inputs. Never timed.
    fn setup(&mut self) -> Result<(), WorkloadError> {
        Ok(())
    }

    /// Perform one unit of work.
    fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError>;

    /// Counters describing one invocation.
    fn counters(&self) -> Counters {
        Counters::default()
    }

    /// Release inputs after measurement.
    fn teardown(&mut self) {}
}

/// Adapter turning a closure into a [`Workload`].
pub struct FnWorkload<F> {
    f: F,
    counters: Counters,
}

impl<F> FnWorkload<F>
where
    F: FnMut(&dyn Barrier) -> Result<u64, WorkloadError>,
{
    pub fn with_counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }
}

impl<F> Workload for FnWorkload<F>
where
    F: FnMut(&dyn Barrier) -> Result<u64, WorkloadError>,
{
    fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError> {
        (self.f)(barrier)
    }

    fn counters(&self) -> Counters {
        self.counters
    }
}

/// Wrap a fallible closure as a workload.
pub fn from_fn<F>(f: F) -> FnWorkload<F>
where
    F: FnMut(&dyn Barrier) -> Result<u64, WorkloadError>,
{
    FnWorkload {
        f,
        counters: Counters::default(),
    }
}
