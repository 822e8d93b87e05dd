// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Comparison of two saved run reports.

use std::io::{self, Write};

use serde::Serialize;

use crate::metrics::{format_latency, RunReport};
use crate::types::WorkloadName;

/// Mean latency of one workload in a baseline and a current run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: WorkloadName,
    /// `None` when missing or failed in the baseline.
    pub baseline_mean_ns: Option<f64>,
    /// `None` when missing or failed in the current run.
    pub current_mean_ns: Option<f64>,
}

impl ComparisonRow {
    /// Relative change of the mean in percent. Positive means slower.
    pub fn change_percent(&self) -> Option<f64> {
        match (self.baseline_mean_ns, self.current_mean_ns) {
            (Some(base), Some(current)) if base > 0.0 => Some((current - base) / base * 100.0),
            _ => None,
        }
    }
}

/// Per-workload comparison, baseline order first, then workloads new in the
/// current run.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn new(baseline: &RunReport, current: &RunReport) -> Self {
        let mut rows: Vec<ComparisonRow> = baseline
            .workloads
            .iter()
            .map(|base| ComparisonRow {
                name: base.name.clone(),
                baseline_mean_ns: base.mean_ns(),
                current_mean_ns: current.get(base.name.as_str()).and_then(|w| w.mean_ns()),
            })
            .collect();

        rows.extend(
            current
                .workloads
                .iter()
                .filter(|w| baseline.get(w.name.as_str()).is_none())
                .map(|w| ComparisonRow {
                    name: w.name.clone(),
                    baseline_mean_ns: None,
                    current_mean_ns: w.mean_ns(),
                }),
        );

        Self { rows }
    }

    /// Rows slower than the baseline by more than `threshold_percent`.
    pub fn regressions(&self, threshold_percent: f64) -> impl Iterator<Item = &ComparisonRow> {
        self.rows
            .iter()
            .filter(move |row| row.change_percent().is_some_and(|c| c > threshold_percent))
    }

    /// Write the comparison as an aligned table.
    pub fn write_table(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{:<24} {:>12} {:>12} {:>10}",
            "Workload", "Baseline", "Current", "Change"
        )?;
        writeln!(out, "{}", "-".repeat(61))?;

        let cell = |mean: Option<f64>| mean.map(format_latency).unwrap_or_else(|| "-".into());
        for row in &self.rows {
            let change = row
                .change_percent()
                .map(|c| format!("{:+.2}%", c))
                .unwrap_or_else(|| "n/a".into());
            writeln!(
                out,
                "{:<24} {:>12} {:>12} {:>10}",
                row.name,
                cell(row.baseline_mean_ns),
                cell(row.current_mean_ns),
                change
            )?;
        }
        Ok(())
    }
}
