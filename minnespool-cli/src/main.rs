//! ## minnespool-cli
//! **Unified operational interface**
//! Minnespool entrypoint driving seeded allocate/release workloads
//! against a registry-managed pool.
//!
//! ### Expectations:
//! - POSIX-compliant argument parsing
//! - Deterministic runs: same seed, same placement trace
//! - Structural invariants cross-checked after every workload

use clap::Parser;

mod commands;
mod workload;

use commands::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_args) => commands::run_workload(run_args),
        Commands::Fuzz(fuzz_args) => commands::run_fuzz(fuzz_args),
    }
}
