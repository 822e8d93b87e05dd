// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `cpuprobe list` command - List registered workloads.
//!
//! Prints one name per line so the output can be piped into `run --regex`.

use cpuprobe_core::{Harness, HarnessConfig, WorkloadFilter};
use cpuprobe_workloads::{register_all, InputParams};

/// Names of the stock workloads selected by `filter`, in registration order.
pub fn matching_names(filter: &WorkloadFilter) -> anyhow::Result<Vec<String>> {
    let mut harness = Harness::new(HarnessConfig::default())?;
    register_all(&mut harness, &InputParams::default())?;

    Ok(harness
        .names()
        .filter(|name| filter.matches(name.as_str()))
        .map(|name| name.to_string())
        .collect())
}

pub fn execute(filter: Option<&str>, regex: bool) -> anyhow::Result<()> {
    let filter = WorkloadFilter::parse(filter, regex)?;
    let names = matching_names(&filter)?;

    if names.is_empty() {
        tracing::warn!(filter = %filter, "No workloads match");
        return Ok(());
    }

    for name in &names {
        println!("{}", name);
    }
    tracing::debug!(count = names.len(), "Listed workloads");

    Ok(())
}
