// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the measurement harness.
//!
//! These tests drive complete runs: registration, warm-up, calibration,
//! measurement and report output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpuprobe_core::{
    from_fn, Barrier, ConfigLoader, ConfigurationError, Harness, HarnessConfig, HarnessError,
    Measurement, NoopAffinity, Phase, ReportFormat, ReportSink, Workload, WorkloadError,
    WorkloadFilter, WorkloadOptions, WorkloadStatus,
};
use tempfile::TempDir;

fn harness(config: HarnessConfig) -> Harness {
    Harness::new(config)
        .expect("valid config")
        .with_affinity(Box::new(NoopAffinity))
}

fn fixed(iterations: u64) -> HarnessConfig {
    HarnessConfig {
        measurement: Measurement::Fixed { iterations },
        ..HarnessConfig::default()
    }
}

/// Busy-wait for `duration`; deterministic per-invocation cost without sleeping.
fn spin(duration: Duration) -> u64 {
    let start = Instant::now();
    let mut spins = 0u64;
    while start.elapsed() < duration {
        spins = spins.wrapping_add(1);
    }
    spins
}

#[test]
fn test_completed_workload_reports_sample_count() {
    let mut h = harness(fixed(100));
    h.register(
        "sum",
        from_fn(|_| Ok((0..1_000u64).fold(0, u64::wrapping_add))),
        WorkloadOptions::new(),
    )
    .unwrap();

    let reports = h.run(&WorkloadFilter::All).unwrap();
    let report = &reports[0];
    assert_eq!(report.status, WorkloadStatus::Completed);
    assert_eq!(report.iterations, 100);

    let latency = report.latency.as_ref().unwrap();
    assert!(latency.min_ns <= latency.median_ns);
    assert!(latency.median_ns <= latency.max_ns);
    assert!(latency.mean_ns >= latency.min_ns as f64);
    assert!(latency.mean_ns <= latency.max_ns as f64);
}

#[test]
fn test_warmup_invocations_are_not_measured() {
    let invocations = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&invocations);

    let mut h = harness(fixed(10));
    h.register(
        "counted",
        from_fn(move |_| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            // Early invocations are slow, as if caches were cold.
            if n < 3 {
                spin(Duration::from_millis(20));
            }
            Ok(n)
        }),
        WorkloadOptions::new().warmup(Duration::from_millis(100)),
    )
    .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.iterations, 10);
    assert!(report.warmup_iterations >= 3);
    assert_eq!(
        invocations.load(Ordering::Relaxed),
        report.warmup_iterations + 10
    );
    assert!(report.latency.as_ref().unwrap().max_ns < 20_000_000);
}

#[test]
fn test_unset_warmup_runs_single_invocation() {
    let mut h = harness(fixed(5));
    h.register("once", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();
    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.warmup_iterations, 1);
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut h = harness(fixed(5));
    h.register("dup", from_fn(|_| Ok(1)), WorkloadOptions::new().iterations(3))
        .unwrap();

    let result = h.register("dup", from_fn(|_| Ok(2)), WorkloadOptions::new());
    assert!(matches!(result, Err(HarnessError::DuplicateName(_))));
    assert_eq!(h.names().count(), 1);

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.iterations, 3);
}

#[test]
fn test_failures_are_isolated() {
    let mut h = harness(fixed(20));
    h.register("first_ok", from_fn(|_| Ok(1)), WorkloadOptions::new())
        .unwrap();

    let mut calls = 0u64;
    h.register(
        "errors_midway",
        from_fn(move |_| {
            calls += 1;
            if calls == 5 {
                Err(WorkloadError::runtime("input exhausted"))
            } else {
                Ok(calls)
            }
        }),
        WorkloadOptions::new(),
    )
    .unwrap();

    h.register(
        "panics",
        from_fn(|_| -> Result<u64, WorkloadError> { panic!("index out of range") }),
        WorkloadOptions::new(),
    )
    .unwrap();
    h.register("last_ok", from_fn(|_| Ok(2)), WorkloadOptions::new())
        .unwrap();

    let reports = h.run(&WorkloadFilter::All).unwrap();
    let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first_ok", "errors_midway", "panics", "last_ok"]);

    assert_eq!(reports[0].status, WorkloadStatus::Completed);
    assert_eq!(reports[3].status, WorkloadStatus::Completed);
    assert_eq!(reports[3].iterations, 20);

    let midway = &reports[1];
    assert_eq!(midway.status, WorkloadStatus::Failed);
    assert!(midway.latency.is_none());
    let failure = midway.failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Measurement);
    assert!(failure.reason.contains("input exhausted"));

    let panicked = reports[2].failure.as_ref().unwrap();
    assert_eq!(reports[2].status, WorkloadStatus::Failed);
    assert_eq!(panicked.phase, Phase::Warmup);
    assert!(panicked.reason.contains("index out of range"));

    assert_eq!(h.run_report().failed_count(), 2);
}

#[test]
fn test_fixed_mode_runs_exact_count() {
    let config = HarnessConfig {
        min_iterations: 50,
        ..fixed(10)
    };
    let mut h = harness(config);
    h.register("exact", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.iterations, 10);
    assert_eq!(report.probe_iterations, 0);
}

#[test]
fn test_target_duration_is_approximated() {
    let target = Duration::from_millis(100);
    let mut h = harness(HarnessConfig::default());
    h.register(
        "spin_50us",
        from_fn(|_| Ok(spin(Duration::from_micros(50)))),
        WorkloadOptions::new().target(target),
    )
    .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.status, WorkloadStatus::Completed);
    assert!(report.probe_iterations > 0);

    let total = Duration::from_nanos(report.total_ns);
    assert!(total >= target / 2, "total {:?} below half of target", total);
    assert!(total <= target * 2, "total {:?} above twice the target", total);
}

#[test]
fn test_target_duration_reached_for_nanosecond_workload() {
    let target = Duration::from_millis(500);
    let mut h = harness(HarnessConfig::default());
    h.register(
        "consume_constant",
        from_fn(|b| Ok(b.consume(7))),
        WorkloadOptions::new().target(target),
    )
    .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.status, WorkloadStatus::Completed);
    assert!(report.iterations > 1_000_000);
    assert!(report.samples.is_none());

    let total = Duration::from_nanos(report.total_ns);
    assert!(total >= target / 2, "total {:?} below half of target", total);
    assert!(total <= target * 2, "total {:?} above twice the target", total);
}

#[test]
fn test_fixed_count_above_calibration_cap() {
    let config = HarnessConfig {
        max_iterations: 1_000,
        ..HarnessConfig::default()
    };
    let mut h = harness(config);
    h.register(
        "many",
        from_fn(|_| Ok(1)),
        WorkloadOptions::new().iterations(2_000_000),
    )
    .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.status, WorkloadStatus::Completed);
    assert_eq!(report.iterations, 2_000_000);
}

#[test]
fn test_calibrated_count_respects_bounds() {
    let config = HarnessConfig {
        max_iterations: 100,
        measurement: Measurement::Target {
            duration: Duration::from_secs(1),
        },
        ..HarnessConfig::default()
    };
    let mut h = harness(config);
    h.register("trivial", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();
    h.register(
        "slow",
        from_fn(|_| Ok(spin(Duration::from_millis(5)))),
        WorkloadOptions::new()
            .target(Duration::from_millis(10))
            .min_iterations(5),
    )
    .unwrap();

    let reports = h.run(&WorkloadFilter::All).unwrap();
    assert_eq!(reports[0].iterations, 100);
    assert_eq!(reports[1].iterations, 5);
}

#[test]
fn test_sanity_bound_fails_slow_workload() {
    let config = HarnessConfig {
        max_invocation: Duration::from_millis(5),
        ..fixed(10)
    };
    let mut h = harness(config);
    h.register(
        "too_slow",
        from_fn(|_| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(0)
        }),
        WorkloadOptions::new(),
    )
    .unwrap();
    h.register("fast", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();

    let reports = h.run(&WorkloadFilter::All).unwrap();
    assert_eq!(reports[0].status, WorkloadStatus::Failed);
    let failure = reports[0].failure.as_ref().unwrap();
    assert_eq!(failure.phase, Phase::Warmup);
    assert!(failure.reason.contains("sanity bound"));
    assert_eq!(reports[1].status, WorkloadStatus::Completed);
}

#[test]
fn test_filter_selects_subset() {
    let mut h = harness(fixed(3));
    for name in ["sum_stride2", "sum_stride4", "vector_add"] {
        h.register(name, from_fn(|_| Ok(0)), WorkloadOptions::new())
            .unwrap();
    }

    let filter = WorkloadFilter::regex(r"stride\d$").unwrap();
    let reports = h.run(&filter).unwrap();
    assert_eq!(reports.len(), 2);
}

#[test]
fn test_no_matching_workload_is_error() {
    let mut h = harness(fixed(3));
    h.register("sum_sequential", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();

    let result = h.run(&WorkloadFilter::substring("matrix"));
    assert!(matches!(
        result,
        Err(HarnessError::Configuration(
            ConfigurationError::NoWorkloadsMatched { .. }
        ))
    ));
}

#[test]
fn test_workload_struct_lifecycle() {
    struct Buffer {
        data: Vec<u64>,
        out: Vec<u64>,
    }

    impl Workload for Buffer {
        fn setup(&mut self) -> Result<(), WorkloadError> {
            self.data = (0..1024).collect();
            self.out = vec![0; 1024];
            Ok(())
        }

        fn iterate(&mut self, barrier: &dyn Barrier) -> Result<u64, WorkloadError> {
            for (o, d) in self.out.iter_mut().zip(&self.data) {
                *o = d * 2;
            }
            barrier.observe(self.out.as_slice());
            Ok(self.out[1023])
        }

        fn teardown(&mut self) {
            self.data = Vec::new();
        }
    }

    let mut h = harness(fixed(10));
    h.register(
        "double",
        Buffer {
            data: Vec::new(),
            out: Vec::new(),
        },
        WorkloadOptions::new(),
    )
    .unwrap();

    let report = &h.run(&WorkloadFilter::All).unwrap()[0];
    assert_eq!(report.status, WorkloadStatus::Completed);
}

#[test]
fn test_config_file_overrides_registration() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cpuprobe.yaml");
    std::fs::write(
        &path,
        r#"
defaults:
  iterations: 7
  keep_samples: true
workloads:
  tuned:
    iterations: 3
  not_registered:
    iterations: 1
"#,
    )
    .expect("Failed to write config");

    let config = ConfigLoader::load_file(&path).unwrap();
    let mut h = harness(config);
    h.register("tuned", from_fn(|_| Ok(0)), WorkloadOptions::new().iterations(50))
        .unwrap();
    h.register("plain", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();

    let reports = h.run(&WorkloadFilter::All).unwrap();
    assert_eq!(reports[0].iterations, 3);
    assert_eq!(reports[1].iterations, 7);
    assert_eq!(reports[1].samples.as_ref().map(Vec::len), Some(7));
}

#[test]
fn test_reports_to_json_and_csv() {
    let mut h = harness(fixed(5));
    h.register("ok", from_fn(|_| Ok(0)), WorkloadOptions::new())
        .unwrap();
    h.register(
        "bad",
        from_fn(|_| Err(WorkloadError::runtime("bad input"))),
        WorkloadOptions::new(),
    )
    .unwrap();
    h.run(&WorkloadFilter::All).unwrap();

    let mut json = Vec::new();
    h.report(&mut ReportSink::new(ReportFormat::Json, &mut json))
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    let workloads = value["workloads"].as_array().unwrap();
    assert_eq!(workloads.len(), 2);
    assert_eq!(workloads[0]["status"], "completed");
    assert_eq!(workloads[1]["status"], "failed");

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = temp_dir.path().join("report.csv");
    let mut sink = ReportSink::file(ReportFormat::Csv, &csv_path).unwrap();
    h.report(&mut sink).unwrap();
    drop(sink);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "ok");
    assert_eq!(&rows[1][1], "failed");
}
