// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Statistics and report records.
//!
//! Reports are derived, read-only data computed from a workload's measured
//! samples as they are recorded. Warm-up and calibration invocations never
//! contribute.

use std::fmt;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

use crate::barrier::BarrierKind;
use crate::error::WorkloadError;
use crate::types::WorkloadName;
use crate::workload::Counters;

/// Highest latency the histogram resolves. Slower samples saturate.
const HISTOGRAM_MAX_NS: u64 = 3_600_000_000_000;
/// Significant figures kept by the histogram (0.1 % relative error).
const HISTOGRAM_SIGFIGS: u8 = 3;

/// Latency statistics over measured samples.
///
/// Min, max, mean and standard deviation are exact. Percentiles come from
/// an HDR histogram and are accurate to three significant figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Minimum observed latency in nanoseconds
    pub min_ns: u64,
    /// Maximum observed latency in nanoseconds
    pub max_ns: u64,
    /// Arithmetic mean latency in nanoseconds
    pub mean_ns: f64,
    /// Median (p50) latency in nanoseconds
    pub median_ns: u64,
    /// 95th percentile latency in nanoseconds
    pub p95_ns: u64,
    /// 99th percentile latency in nanoseconds
    pub p99_ns: u64,
    /// Population standard deviation in nanoseconds
    pub std_dev_ns: f64,
}

impl LatencyStats {
    /// Calculate statistics from latency samples (in nanoseconds).
    /// Returns `None` for an empty sample set.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        LatencyRecorder::from_samples(samples, false).ok()?.stats()
    }
}

/// Streaming accumulator for measured samples.
///
/// Memory stays constant regardless of the iteration count; raw samples are
/// only retained when requested.
pub struct LatencyRecorder {
    histogram: Histogram<u64>,
    count: u64,
    total_ns: u64,
    min_ns: u64,
    max_ns: u64,
    mean_ns: f64,
    // Welford running sum of squared deviations.
    m2: f64,
    samples: Option<Vec<u64>>,
}

impl LatencyRecorder {
    pub fn new(keep_samples: bool) -> Result<Self, WorkloadError> {
        let histogram = Histogram::new_with_bounds(1, HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIGS)
            .map_err(|e| WorkloadError::Recorder {
                reason: e.to_string(),
            })?;

        Ok(Self {
            histogram,
            count: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            mean_ns: 0.0,
            m2: 0.0,
            samples: keep_samples.then(Vec::new),
        })
    }

    /// Build a recorder holding `samples`.
    pub fn from_samples(samples: &[u64], keep_samples: bool) -> Result<Self, WorkloadError> {
        let mut recorder = Self::new(keep_samples)?;
        for &ns in samples {
            recorder.record(ns);
        }
        Ok(recorder)
    }

    /// Reserve room for `additional` raw samples when they are retained.
    pub fn reserve(&mut self, additional: usize) {
        if let Some(samples) = &mut self.samples {
            samples.reserve(additional);
        }
    }

    #[inline]
    pub fn record(&mut self, ns: u64) {
        self.count += 1;
        self.total_ns = self.total_ns.saturating_add(ns);
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);

        let value = ns as f64;
        let delta = value - self.mean_ns;
        self.mean_ns += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_ns);

        self.histogram.saturating_record(ns);
        if let Some(samples) = &mut self.samples {
            samples.push(ns);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of recorded samples, saturating at `u64::MAX`.
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }

    /// `None` until something has been recorded.
    pub fn stats(&self) -> Option<LatencyStats> {
        if self.count == 0 {
            return None;
        }

        // Bucket edges can overshoot the exact extremes.
        let percentile = |q: f64| {
            self.histogram
                .value_at_quantile(q)
                .clamp(self.min_ns, self.max_ns)
        };

        Some(LatencyStats {
            min_ns: self.min_ns,
            max_ns: self.max_ns,
            mean_ns: self.mean_ns,
            median_ns: percentile(0.50),
            p95_ns: percentile(0.95),
            p99_ns: percentile(0.99),
            std_dev_ns: (self.m2 / self.count as f64).sqrt(),
        })
    }

    /// Retained raw samples, if requested at construction.
    pub fn into_samples(self) -> Option<Vec<u64>> {
        self.samples
    }
}

/// Format latency in human-readable form (auto-selects ns/μs/ms/s).
pub fn format_latency(ns: f64) -> String {
    if ns < 1_000.0 {
        format!("{:.0}ns", ns)
    } else if ns < 1_000_000.0 {
        format!("{:.2}μs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.2}ms", ns / 1_000_000.0)
    } else {
        format!("{:.2}s", ns / 1_000_000_000.0)
    }
}

/// Format a byte rate in human-readable form.
pub fn format_bytes_per_sec(bps: f64) -> String {
    if bps < 1_000.0 {
        format!("{:.2} B/s", bps)
    } else if bps < 1_000_000.0 {
        format!("{:.2} KB/s", bps / 1_000.0)
    } else if bps < 1_000_000_000.0 {
        format!("{:.2} MB/s", bps / 1_000_000.0)
    } else {
        format!("{:.2} GB/s", bps / 1_000_000_000.0)
    }
}

/// Throughput derived from counters and mean latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_sec: Option<f64>,
}

impl Throughput {
    /// `None` when the workload declares no counters or the mean is zero.
    pub fn calculate(counters: &Counters, mean_ns: f64) -> Option<Self> {
        if mean_ns <= 0.0 {
            return None;
        }
        let per_sec = |count: u64| count as f64 * 1_000_000_000.0 / mean_ns;
        let throughput = Self {
            bytes_per_sec: counters.bytes_per_iteration.map(per_sec),
            items_per_sec: counters.items_per_iteration.map(per_sec),
        };
        if throughput.bytes_per_sec.is_none() && throughput.items_per_sec.is_none() {
            None
        } else {
            Some(throughput)
        }
    }
}

/// System information captured at benchmark time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// OS version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: Option<String>,
    /// CPU model name
    pub cpu_model: String,
    /// Number of logical CPUs
    pub cpu_cores: usize,
    /// Total system memory in bytes
    pub memory_bytes: u64,
    /// Hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Outcome of one workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Completed,
    Failed,
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadStatus::Completed => write!(f, "completed"),
            WorkloadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Harness phase a workload was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Warmup,
    Calibration,
    Measurement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Warmup => write!(f, "warmup"),
            Phase::Calibration => write!(f, "calibration"),
            Phase::Measurement => write!(f, "measurement"),
        }
    }
}

/// Why a workload failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub phase: Phase,
    pub reason: String,
}

/// Report for one workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub name: WorkloadName,
    pub status: WorkloadStatus,
    /// Measured iterations. Zero for failed workloads.
    pub iterations: u64,
    /// Untimed warm-up invocations.
    pub warmup_iterations: u64,
    /// Calibration probe invocations, discarded like warm-up.
    pub probe_iterations: u64,
    /// Sum of measured sample times.
    pub total_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<Throughput>,
    #[serde(default)]
    pub counters: Counters,
    /// Raw samples, only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl WorkloadReport {
    /// Build a completed report from the recorded measurement phase.
    pub fn completed(
        name: WorkloadName,
        recorder: LatencyRecorder,
        warmup_iterations: u64,
        probe_iterations: u64,
        counters: Counters,
    ) -> Self {
        let latency = recorder.stats();
        let throughput = latency
            .as_ref()
            .and_then(|l| Throughput::calculate(&counters, l.mean_ns));

        Self {
            name,
            status: WorkloadStatus::Completed,
            iterations: recorder.count(),
            warmup_iterations,
            probe_iterations,
            total_ns: recorder.total_ns(),
            latency,
            throughput,
            counters,
            samples: recorder.into_samples(),
            failure: None,
        }
    }

    /// Build a failed report. Partial samples are never aggregated.
    pub fn failed(
        name: WorkloadName,
        phase: Phase,
        error: &WorkloadError,
        warmup_iterations: u64,
        probe_iterations: u64,
        counters: Counters,
    ) -> Self {
        Self {
            name,
            status: WorkloadStatus::Failed,
            iterations: 0,
            warmup_iterations,
            probe_iterations,
            total_ns: 0,
            latency: None,
            throughput: None,
            counters,
            samples: None,
            failure: Some(Failure {
                phase,
                reason: error.to_string(),
            }),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkloadStatus::Completed
    }

    pub fn mean_ns(&self) -> Option<f64> {
        self.latency.as_ref().map(|l| l.mean_ns)
    }
}

/// Complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Suite identifier
    pub benchmark_suite: String,
    /// Harness version
    pub version: String,
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the report was produced
    pub timestamp: DateTime<Utc>,
    /// System information
    pub system_info: SystemInfo,
    /// Core the harness thread was pinned to, if any
    pub pinned_core: Option<usize>,
    /// Barrier implementation used
    pub barrier: BarrierKind,
    /// Per-workload reports, in execution order
    pub workloads: Vec<WorkloadReport>,
}

impl RunReport {
    /// Create a new run report.
    pub fn new(
        workloads: Vec<WorkloadReport>,
        pinned_core: Option<usize>,
        barrier: BarrierKind,
    ) -> Self {
        Self {
            benchmark_suite: "cpuprobe".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            pinned_core,
            barrier,
            workloads,
        }
    }

    /// Count of workloads that failed.
    pub fn failed_count(&self) -> usize {
        self.workloads.iter().filter(|w| !w.is_completed()).count()
    }

    pub fn get(&self, name: &str) -> Option<&WorkloadReport> {
        self.workloads.iter().find(|w| w.name.as_str() == name)
    }
}
