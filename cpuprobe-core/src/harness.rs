// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark harness for running and timing registered workloads.
//!
//! Each selected workload goes through four phases, strictly one workload at a
//! time on the calling thread:
//!
//! 1. **Warm-up**: untimed invocations until the minimum warm-up time has
//!    elapsed (a single invocation when unset).
//! 2. **Calibration**: with a target duration, a short probe estimates how
//!    many iterations fill it.
//! 3. **Measurement**: every iteration is timed on the monotonic clock, its
//!    result consumed by the barrier and memory optionally clobbered.
//! 4. **Aggregation**: statistics over the measured samples only, folded into
//!    a [`LatencyRecorder`] as they are taken.
//!
//! A workload that errors or panics is reported as `Failed`; the run moves on.
//! A requested core pin holds for the duration of [`Harness::run`] only.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::affinity::{self, CoreAffinity};
use crate::barrier::Barrier;
use crate::config::{HarnessConfig, Measurement, RunConfig, WorkloadOptions};
use crate::error::{ConfigurationError, HarnessError, HarnessResult, WorkloadError};
use crate::filter::WorkloadFilter;
use crate::metrics::{LatencyRecorder, Phase, RunReport, WorkloadReport};
use crate::registry::WorkloadRegistry;
use crate::reporter::ReportSink;
use crate::types::WorkloadName;
use crate::workload::Workload;

/// The measurement harness. Owns the registry and the collected reports.
pub struct Harness {
    config: HarnessConfig,
    registry: WorkloadRegistry,
    barrier: Box<dyn Barrier>,
    affinity: Box<dyn CoreAffinity>,
    reports: Vec<WorkloadReport>,
    pinned_core: Option<usize>,
}

impl Harness {
    /// Create a harness using the configured barrier and the platform's
    /// affinity capability.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        Ok(Self {
            barrier: config.barrier.build(),
            affinity: affinity::platform_affinity(),
            config,
            registry: WorkloadRegistry::new(),
            reports: Vec::new(),
            pinned_core: None,
        })
    }

    /// Replace the barrier implementation.
    pub fn with_barrier(mut self, barrier: Box<dyn Barrier>) -> Self {
        self.config.barrier = barrier.kind();
        self.barrier = barrier;
        self
    }

    /// Replace the affinity capability.
    pub fn with_affinity(mut self, affinity: Box<dyn CoreAffinity>) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Register a workload under a unique name.
    pub fn register(
        &mut self,
        name: &str,
        workload: impl Workload + 'static,
        options: WorkloadOptions,
    ) -> HarnessResult<()> {
        let name = WorkloadName::new(name)?;
        options.validate(self.config.max_iterations)?;
        self.registry.register(name, Box::new(workload), options)?;
        Ok(())
    }

    /// Registered workload names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &WorkloadName> {
        self.registry.names()
    }

    pub fn registry(&self) -> &WorkloadRegistry {
        &self.registry
    }

    /// Run every registered workload selected by `filter`.
    ///
    /// Fails only for harness-level faults; individual workload failures are
    /// recorded in their reports.
    pub fn run(&mut self, filter: &WorkloadFilter) -> HarnessResult<&[WorkloadReport]> {
        if self.registry.count_matching(filter) == 0 {
            return Err(ConfigurationError::NoWorkloadsMatched {
                filter: filter.to_string(),
            }
            .into());
        }

        for name in self.config.overrides.keys() {
            if !self.registry.contains(name) {
                tracing::warn!(workload = %name, "Override names an unregistered workload");
            }
        }

        self.pinned_core = self
            .config
            .pin_core
            .and_then(|core| affinity::try_pin(self.affinity.as_ref(), core));

        let barrier: &dyn Barrier = &*self.barrier;
        self.reports.clear();
        for entry in self.registry.select_mut(filter) {
            let run_config = self.config.resolve(&entry.name, &entry.options);
            tracing::info!(
                workload = %entry.name,
                measurement = ?run_config.measurement,
                warmup = ?run_config.min_warmup,
                "Running workload"
            );

            let report = run_workload(
                &entry.name,
                entry.workload.as_mut(),
                barrier,
                &run_config,
            );

            match (&report.latency, &report.failure) {
                (Some(latency), _) => tracing::info!(
                    workload = %report.name,
                    iterations = report.iterations,
                    mean_ns = latency.mean_ns,
                    min_ns = latency.min_ns,
                    max_ns = latency.max_ns,
                    "Workload completed"
                ),
                (None, Some(failure)) => tracing::warn!(
                    workload = %report.name,
                    phase = %failure.phase,
                    reason = %failure.reason,
                    "Workload failed"
                ),
                (None, None) => {}
            }

            self.reports.push(report);
        }

        if self.pinned_core.is_some() {
            affinity::restore(self.affinity.as_ref());
        }

        Ok(&self.reports)
    }

    /// Reports from the most recent run.
    pub fn reports(&self) -> &[WorkloadReport] {
        &self.reports
    }

    /// Assemble the run report from the most recent run.
    pub fn run_report(&self) -> RunReport {
        RunReport::new(self.reports.clone(), self.pinned_core, self.barrier.kind())
    }

    /// Serialize all collected reports to `sink`.
    pub fn report(&self, sink: &mut ReportSink<'_>) -> HarnessResult<RunReport> {
        let report = self.run_report();
        sink.emit(&report).map_err(HarnessError::Report)?;
        Ok(report)
    }
}

/// Timer for measuring individual invocations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed duration.
    #[inline(always)]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

/// Progress tracked across phases so a failure can report where it happened.
struct Progress {
    phase: Phase,
    warmup_iterations: u64,
    probe_iterations: u64,
}

fn run_workload(
    name: &WorkloadName,
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    config: &RunConfig,
) -> WorkloadReport {
    let mut progress = Progress {
        phase: Phase::Setup,
        warmup_iterations: 0,
        probe_iterations: 0,
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        execute(workload, barrier, config, &mut progress)
    }))
    .unwrap_or_else(|payload| {
        Err(WorkloadError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    });

    let counters = workload.counters();
    let report = match outcome {
        Ok(recorder) => WorkloadReport::completed(
            name.clone(),
            recorder,
            progress.warmup_iterations,
            progress.probe_iterations,
            counters,
        ),
        Err(error) => WorkloadReport::failed(
            name.clone(),
            progress.phase,
            &error,
            progress.warmup_iterations,
            progress.probe_iterations,
            counters,
        ),
    };

    if panic::catch_unwind(AssertUnwindSafe(|| workload.teardown())).is_err() {
        tracing::warn!(workload = %name, "Workload teardown panicked");
    }

    report
}

fn execute(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    config: &RunConfig,
    progress: &mut Progress,
) -> Result<LatencyRecorder, WorkloadError> {
    progress.phase = Phase::Setup;
    workload.setup()?;

    progress.phase = Phase::Warmup;
    warm_up(workload, barrier, config, progress)?;

    let iterations = match config.measurement {
        Measurement::Fixed { iterations } => iterations,
        Measurement::Target { duration } => {
            progress.phase = Phase::Calibration;
            calibrate(workload, barrier, config, duration, progress)?
        }
    };

    progress.phase = Phase::Measurement;
    measure(workload, barrier, config, iterations)
}

/// One invocation with the barrier applied to its result and memory.
#[inline(always)]
fn invoke(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    clobber_memory: bool,
) -> Result<(), WorkloadError> {
    let value = workload.iterate(barrier)?;
    barrier.consume(value);
    if clobber_memory {
        barrier.fence();
    }
    Ok(())
}

/// One timed invocation.
#[inline(always)]
fn timed_invoke(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    clobber_memory: bool,
) -> Result<Duration, WorkloadError> {
    let timer = Timer::start();
    invoke(workload, barrier, clobber_memory)?;
    Ok(timer.stop())
}

fn check_sanity_bound(elapsed: Duration, config: &RunConfig) -> Result<(), WorkloadError> {
    if elapsed > config.max_invocation {
        return Err(WorkloadError::Calibration {
            elapsed,
            limit: config.max_invocation,
        });
    }
    Ok(())
}

fn warm_up(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    config: &RunConfig,
    progress: &mut Progress,
) -> Result<(), WorkloadError> {
    let started = Instant::now();
    loop {
        let elapsed = timed_invoke(workload, barrier, config.clobber_memory)?;
        progress.warmup_iterations += 1;
        check_sanity_bound(elapsed, config)?;

        match config.min_warmup {
            Some(min) if started.elapsed() < min => continue,
            _ => break,
        }
    }

    tracing::debug!(
        invocations = progress.warmup_iterations,
        elapsed = ?started.elapsed(),
        "Warm-up finished"
    );
    Ok(())
}

/// Estimate the iteration count whose summed sample time approximates `target`.
///
/// The probe times invocations exactly as the measurement phase does, so the
/// per-invocation estimate includes the same timer overhead.
fn calibrate(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    config: &RunConfig,
    target: Duration,
    progress: &mut Progress,
) -> Result<u64, WorkloadError> {
    let budget = config.probe_time.min(target);
    let started = Instant::now();
    let mut measured = Duration::ZERO;

    while progress.probe_iterations == 0
        || (started.elapsed() < budget && progress.probe_iterations < config.max_iterations)
    {
        let elapsed = timed_invoke(workload, barrier, config.clobber_memory)?;
        progress.probe_iterations += 1;
        check_sanity_bound(elapsed, config)?;
        measured += elapsed;
    }

    let probes = progress.probe_iterations;
    let per_iteration_ns = (measured.as_nanos() as f64 / probes as f64).max(1.0);
    let estimate = (target.as_nanos() as f64 / per_iteration_ns).round() as u64;
    let iterations = estimate.clamp(config.min_iterations, config.max_iterations);

    tracing::debug!(
        probes = probes,
        per_iteration_ns = per_iteration_ns,
        estimate = estimate,
        iterations = iterations,
        "Calibration finished"
    );
    Ok(iterations)
}

/// Raw samples are reserved up front at most this far.
const SAMPLE_RESERVE_LIMIT: u64 = 1 << 20;

fn measure(
    workload: &mut dyn Workload,
    barrier: &dyn Barrier,
    config: &RunConfig,
    iterations: u64,
) -> Result<LatencyRecorder, WorkloadError> {
    let mut recorder = LatencyRecorder::new(config.keep_samples)?;
    recorder.reserve(iterations.min(SAMPLE_RESERVE_LIMIT) as usize);
    for _ in 0..iterations {
        let elapsed = timed_invoke(workload, barrier, config.clobber_memory)?;
        recorder.record(elapsed.as_nanos() as u64);
    }
    Ok(recorder)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
