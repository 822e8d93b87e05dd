//! cpuprobe Core Library
//!
//! Microbenchmark harness for studying CPU and memory-subsystem effects.
//! Provides the workload registry, warm-up/calibration/measurement phases,
//! optimization barriers, best-effort core pinning and report serialization.

pub mod affinity;
pub mod barrier;
pub mod compare;
pub mod config;
pub mod error;
pub mod filter;
pub mod harness;
pub mod metrics;
pub mod registry;
pub mod reporter;
pub mod types;
pub mod workload;

// Re-export commonly used types
pub use affinity::{platform_affinity, CoreAffinity, NoopAffinity};
pub use barrier::{Barrier, BarrierKind, HintBarrier, VolatileBarrier};
pub use compare::{Comparison, ComparisonRow};
pub use config::{ConfigLoader, HarnessConfig, Measurement, RunConfig, WorkloadOptions};
pub use error::{AffinityError, ConfigurationError, HarnessError, HarnessResult, WorkloadError};
pub use filter::WorkloadFilter;
pub use harness::{Harness, Timer};
pub use metrics::{
    format_bytes_per_sec, format_latency, Failure, LatencyRecorder, LatencyStats, Phase, RunReport,
    SystemInfo, Throughput, WorkloadReport, WorkloadStatus,
};
pub use registry::WorkloadRegistry;
pub use reporter::{ReportFormat, ReportSink, ReportStore, ReporterError};
pub use types::WorkloadName;
pub use workload::{from_fn, Counters, FnWorkload, Workload};
