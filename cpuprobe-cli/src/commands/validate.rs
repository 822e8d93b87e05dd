// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `cpuprobe validate` command - Validate configuration file.

use anyhow::Context;
use cpuprobe_core::{ConfigLoader, Measurement, WorkloadFilter};

use super::list::matching_names;
use super::run::DEFAULT_WARMUP;

pub fn execute(file: &str) -> anyhow::Result<()> {
    tracing::info!(file = %file, "Validating configuration");

    let config = ConfigLoader::load_file(file)
        .with_context(|| format!("✗ Configuration validation failed: {}", file))?;

    println!("✓ Configuration is valid");
    println!();
    println!("Defaults:");
    match config.min_warmup {
        Some(warmup) => println!("  Warm-up:            {:?}", warmup),
        None => println!("  Warm-up:            {:?} (default)", DEFAULT_WARMUP),
    }
    match config.measurement {
        Measurement::Fixed { iterations } => {
            println!("  Measurement:        {} iterations", iterations)
        }
        Measurement::Target { duration } => println!("  Measurement:        {:?} target", duration),
    }
    println!(
        "  Iteration Bounds:   {}..={}",
        config.min_iterations, config.max_iterations
    );
    println!("  Sanity Bound:       {:?}", config.max_invocation);
    println!("  Barrier:            {}", config.barrier);
    match config.pin_core {
        Some(core) => println!("  Pin Core:           {}", core),
        None => println!("  Pin Core:           none"),
    }

    if !config.overrides.is_empty() {
        let known = matching_names(&WorkloadFilter::All)?;
        println!();
        println!("Workload Overrides ({}):", config.overrides.len());
        for name in config.overrides.keys() {
            let marker = if known.iter().any(|k| k == name.as_str()) {
                ""
            } else {
                " (not a stock workload)"
            };
            println!("  - {}{}", name, marker);
        }
    }

    Ok(())
}
