// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `cpuprobe compare` command - Diff two saved JSON reports.

use anyhow::Context;
use cpuprobe_core::{Comparison, ReportStore};

pub fn execute(baseline: &str, current: &str, threshold: f64) -> anyhow::Result<()> {
    let base = ReportStore::load(baseline)
        .with_context(|| format!("loading baseline report {}", baseline))?;
    let curr =
        ReportStore::load(current).with_context(|| format!("loading current report {}", current))?;

    tracing::info!(
        baseline = %base.run_id,
        current = %curr.run_id,
        "Comparing reports"
    );

    let comparison = Comparison::new(&base, &curr);
    let stdout = std::io::stdout();
    comparison.write_table(&mut stdout.lock())?;

    for row in comparison.regressions(threshold) {
        tracing::warn!(
            workload = %row.name,
            change_percent = row.change_percent().unwrap_or_default(),
            "Regression above threshold"
        );
    }

    Ok(())
}
