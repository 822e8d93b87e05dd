// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `cpuprobe run` command - Run workloads and emit a report.
//!
//! Flags override the run-wide defaults from the config file; per-workload
//! entries in the file stay the most specific setting.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use cpuprobe_core::{
    BarrierKind, ConfigLoader, Harness, HarnessConfig, Measurement, ReportFormat, ReportSink,
    ReportStore, WorkloadFilter,
};
use cpuprobe_workloads::{input, register_all, InputParams};

/// Warm-up used when neither a flag nor the config file sets one.
/// `warmup_ms: 0` in the file asks for a single warm-up invocation.
pub(crate) const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Only run workloads whose name contains this string (or matches it with --regex)
    pub filter: Option<String>,

    /// Treat FILTER as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Minimum warm-up time in milliseconds
    #[arg(long)]
    pub warmup_ms: Option<u64>,

    /// Run exactly this many measured iterations
    #[arg(long, conflicts_with = "target_ms")]
    pub iterations: Option<u64>,

    /// Calibrate iterations to fill this many milliseconds
    #[arg(long)]
    pub target_ms: Option<u64>,

    /// Lower bound on calibrated iterations
    #[arg(long)]
    pub min_iterations: Option<u64>,

    /// Upper bound on calibrated iterations
    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Elements per input buffer
    #[arg(long, default_value_t = input::DEFAULT_ELEMENTS)]
    pub elements: usize,

    /// Seed for shuffled inputs
    #[arg(long, default_value_t = input::DEFAULT_SEED)]
    pub seed: u64,

    /// Pin the harness thread to this logical CPU
    #[arg(long)]
    pub pin_core: Option<usize>,

    /// Optimization barrier: hint or volatile
    #[arg(long)]
    pub barrier: Option<BarrierKind>,

    /// Output format: table, csv or json
    #[arg(short, long, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also save the JSON report into this directory
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Include raw samples in the report
    #[arg(long)]
    pub keep_samples: bool,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Build the harness configuration: file (or built-in defaults), then flags.
    pub fn harness_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        config.min_warmup = self
            .warmup_ms
            .map(Duration::from_millis)
            .or(config.min_warmup)
            .or(Some(DEFAULT_WARMUP));
        if let Some(iterations) = self.iterations {
            config.measurement = Measurement::Fixed { iterations };
        }
        if let Some(ms) = self.target_ms {
            config.measurement = Measurement::Target {
                duration: Duration::from_millis(ms),
            };
        }
        if let Some(min) = self.min_iterations {
            config.min_iterations = min;
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
        if self.pin_core.is_some() {
            config.pin_core = self.pin_core;
        }
        if let Some(barrier) = self.barrier {
            config.barrier = barrier;
        }
        if self.keep_samples {
            config.keep_samples = true;
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = args.harness_config()?;
    let filter = WorkloadFilter::parse(args.filter.as_deref(), args.regex)?;
    let params = InputParams::new(args.elements)?.with_seed(args.seed);

    let mut harness = Harness::new(config)?;
    register_all(&mut harness, &params)?;

    tracing::info!(
        filter = %filter,
        elements = params.elements,
        barrier = %harness.config().barrier,
        "Starting run"
    );
    harness.run(&filter)?;

    let mut sink = match &args.output {
        Some(path) => ReportSink::file(args.format, path)
            .with_context(|| format!("opening output {}", path.display()))?,
        None => ReportSink::stdout(args.format),
    };
    let report = harness.report(&mut sink)?;
    drop(sink);

    if let Some(dir) = &args.save_dir {
        ReportStore::new(dir)?.save(&report)?;
    }

    let failed = report.failed_count();
    if failed > 0 {
        tracing::warn!(
            failed = failed,
            total = report.workloads.len(),
            "Some workloads failed"
        );
    }

    Ok(())
}
