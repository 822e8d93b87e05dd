// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! cpuprobe CLI
//!
//! Command-line interface for the cpuprobe microbenchmark harness.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// cpuprobe - Microbenchmarks for caches, memory bandwidth and branch prediction
#[derive(Parser)]
#[command(name = "cpuprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run workloads and print a report
    Run(commands::run::RunArgs),

    /// List registered workloads
    List {
        /// Only names containing this string (or matching it with --regex)
        filter: Option<String>,

        /// Treat FILTER as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Compare two saved JSON reports
    Compare {
        /// Baseline report
        baseline: String,

        /// Current report
        current: String,

        /// Flag workloads slower than the baseline by more than this percentage
        #[arg(long, default_value_t = 5.0)]
        threshold: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over -v
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::List { filter, regex } => commands::list::execute(filter.as_deref(), regex),
        Commands::Validate { file } => commands::validate::execute(&file),
        Commands::Compare {
            baseline,
            current,
            threshold,
        } => commands::compare::execute(&baseline, &current, threshold),
    }
}
