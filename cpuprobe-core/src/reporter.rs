// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Report sinks.
//!
//! A [`ReportSink`] renders a finished [`RunReport`] as a human table, CSV or
//! JSON onto any writer. [`ReportStore`] keeps timestamped JSON reports in a
//! directory for comparison across runs.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::error::ConfigurationError;
use crate::metrics::{format_bytes_per_sec, format_latency, RunReport, WorkloadReport};

/// CSV column order. Stable across releases.
pub const CSV_HEADER: [&str; 14] = [
    "name",
    "status",
    "iterations",
    "warmup_iterations",
    "total_ns",
    "mean_ns",
    "min_ns",
    "max_ns",
    "median_ns",
    "p99_ns",
    "std_dev_ns",
    "bytes_per_sec",
    "failed_phase",
    "reason",
];

/// Errors that can occur while writing reports.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Report I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Table => write!(f, "table"),
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(ConfigurationError::InvalidFieldValue {
                field: "format",
                value: other.to_string(),
                reason: "Expected 'table', 'csv' or 'json'".to_string(),
            }),
        }
    }
}

/// Where and how a report is written.
pub struct ReportSink<'a> {
    format: ReportFormat,
    writer: Box<dyn Write + 'a>,
}

impl<'a> ReportSink<'a> {
    /// Sink writing to any writer.
    pub fn new(format: ReportFormat, writer: impl Write + 'a) -> Self {
        Self {
            format,
            writer: Box::new(writer),
        }
    }

    /// Sink writing to standard output.
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(format, io::stdout().lock())
    }

    /// Sink writing to a file, truncating it.
    pub fn file(format: ReportFormat, path: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let file = File::create(path)?;
        Ok(Self::new(format, BufWriter::new(file)))
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Render the whole report and flush.
    pub fn emit(&mut self, report: &RunReport) -> Result<(), ReporterError> {
        match self.format {
            ReportFormat::Table => write_table(&mut self.writer, report)?,
            ReportFormat::Csv => write_csv(&mut self.writer, report)?,
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, report)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

fn write_table(out: &mut dyn Write, report: &RunReport) -> Result<(), ReporterError> {
    writeln!(
        out,
        "cpuprobe {} | run {} | {} ({} cpus) | barrier={} | pinned={}",
        report.version,
        report.run_id,
        report.system_info.cpu_model,
        report.system_info.cpu_cores,
        report.barrier,
        report
            .pinned_core
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string()),
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<24} {:>10} {:>12} {:>12} {:>12} {:>14}",
        "workload", "iters", "mean", "min", "max", "throughput"
    )?;
    writeln!(out, "{}", "-".repeat(89))?;

    for workload in &report.workloads {
        match (&workload.latency, &workload.failure) {
            (Some(latency), _) => {
                let throughput = workload
                    .throughput
                    .as_ref()
                    .and_then(|t| t.bytes_per_sec)
                    .map(format_bytes_per_sec)
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{:<24} {:>10} {:>12} {:>12} {:>12} {:>14}",
                    workload.name.as_str(),
                    workload.iterations,
                    format_latency(latency.mean_ns),
                    format_latency(latency.min_ns as f64),
                    format_latency(latency.max_ns as f64),
                    throughput,
                )?;
            }
            (None, Some(failure)) => {
                writeln!(
                    out,
                    "{:<24} FAILED during {}: {}",
                    workload.name.as_str(),
                    failure.phase,
                    failure.reason
                )?;
            }
            (None, None) => {
                writeln!(out, "{:<24} no samples", workload.name.as_str())?;
            }
        }
    }

    let failed = report.failed_count();
    if failed > 0 {
        writeln!(out)?;
        writeln!(
            out,
            "{} of {} workloads failed",
            failed,
            report.workloads.len()
        )?;
    }
    Ok(())
}

fn csv_record(w: &WorkloadReport) -> Vec<String> {
    let opt = |v: Option<String>| v.unwrap_or_default();
    let latency = w.latency.as_ref();
    vec![
        w.name.to_string(),
        w.status.to_string(),
        w.iterations.to_string(),
        w.warmup_iterations.to_string(),
        w.total_ns.to_string(),
        opt(latency.map(|l| format!("{:.2}", l.mean_ns))),
        opt(latency.map(|l| l.min_ns.to_string())),
        opt(latency.map(|l| l.max_ns.to_string())),
        opt(latency.map(|l| l.median_ns.to_string())),
        opt(latency.map(|l| l.p99_ns.to_string())),
        opt(latency.map(|l| format!("{:.2}", l.std_dev_ns))),
        opt(w
            .throughput
            .as_ref()
            .and_then(|t| t.bytes_per_sec)
            .map(|b| format!("{:.2}", b))),
        opt(w.failure.as_ref().map(|f| f.phase.to_string())),
        opt(w.failure.as_ref().map(|f| f.reason.clone())),
    ]
}

fn write_csv(out: &mut dyn Write, report: &RunReport) -> Result<(), ReporterError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(CSV_HEADER)?;
    for workload in &report.workloads {
        wtr.write_record(csv_record(workload))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Directory of timestamped JSON reports.
pub struct ReportStore {
    /// Output directory for report files
    output_dir: PathBuf,
}

impl ReportStore {
    /// Create a store, creating the directory if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Save a report as `cpuprobe_<timestamp>_<run-id prefix>.json`.
    ///
    /// Returns the path to the created file.
    pub fn save(&self, report: &RunReport) -> Result<PathBuf, ReporterError> {
        let timestamp = report.timestamp.format("%Y-%m-%dT%H-%M-%SZ");
        let run_id = report.run_id.simple().to_string();
        let filename = format!("cpuprobe_{}_{}.json", timestamp, &run_id[..8]);
        let filepath = self.output_dir.join(filename);

        let file = File::create(&filepath)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;

        tracing::info!(path = %filepath.display(), "Saved run report");
        Ok(filepath)
    }

    /// List all JSON reports in the directory, oldest first.
    pub fn list_reports(&self) -> Result<Vec<PathBuf>, ReporterError> {
        let mut reports = Vec::new();
        for entry in fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                reports.push(path);
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Load a report from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<RunReport, ReporterError> {
        let file = File::open(path)?;
        let report = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(report)
    }
}
