use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use minnespool_config::MinnespoolConfig;
use minnespool_core::PlacementPolicy;
use minnespool_registry::PoolRegistry;
use minnespool_telemetry::logging::EventLogger;
use minnespool_telemetry::metrics::MetricsRecorder;

use crate::workload::{WorkloadDriver, WorkloadReport};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one seeded allocate/release workload against a fresh pool
    Run(RunArgs),
    /// Run continuous workloads with auto-incrementing seeds
    Fuzz(FuzzArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Optional configuration file; defaults and env overrides apply otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the number of operations from the config.
    #[arg(long)]
    pub ops: Option<usize>,
    /// Override the workload seed from the config.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Override the pool size in bytes from the config.
    #[arg(long)]
    pub size: Option<usize>,
    /// Override the placement policy (first_fit or best_fit).
    #[arg(long)]
    pub policy: Option<PlacementPolicy>,
}

#[derive(Args, Debug, Clone)]
pub struct FuzzArgs {
    /// Optional configuration file; defaults and env overrides apply otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Initial seed for fuzzing (will auto-increment)
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    /// Number of fuzzing iterations (0 for unlimited)
    #[arg(long, default_value_t = 0)]
    pub iterations: usize,
}

type CliError = Box<dyn std::error::Error + Send + Sync>;

pub fn run_workload(args: RunArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    EventLogger::init_with_filter(&config.telemetry.log_filter);
    let metrics = MetricsRecorder::new();

    let report = execute_run(&config, &metrics)?;
    println!("{}", serde_yaml::to_string(&report)?);
    println!("{}", metrics.gather_metrics()?);
    Ok(())
}

pub fn run_fuzz(args: FuzzArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    EventLogger::init_with_filter(&config.telemetry.log_filter);
    let metrics = MetricsRecorder::new();

    let mut seed = args.seed;
    let mut count = 0usize;
    loop {
        config.workload.seed = seed;
        let report = execute_run(&config, &metrics)?;
        info!(
            seed,
            placed = report.placed,
            refused = report.refused,
            "fuzz iteration clean"
        );

        count += 1;
        if args.iterations > 0 && count >= args.iterations {
            break;
        }
        seed += 1;
    }
    println!("{}", metrics.gather_metrics()?);
    Ok(())
}

fn load_config(path: &Option<PathBuf>) -> Result<MinnespoolConfig, CliError> {
    let config = match path {
        Some(path) => MinnespoolConfig::load_from_path(path)?,
        None => MinnespoolConfig::load()?,
    };
    Ok(config)
}

fn apply_overrides(config: &mut MinnespoolConfig, args: &RunArgs) {
    if let Some(ops) = args.ops {
        config.workload.operations = ops;
    }
    if let Some(seed) = args.seed {
        config.workload.seed = seed;
    }
    if let Some(size) = args.size {
        config.pool.size_bytes = size;
    }
    if let Some(policy) = args.policy {
        config.pool.policy = policy;
    }
}

/// One full run: open a registry and a pool, drive the workload, close
/// both. Every layer's lifecycle guard is exercised on the way out.
fn execute_run(
    config: &MinnespoolConfig,
    metrics: &MetricsRecorder,
) -> Result<WorkloadReport, CliError> {
    let mut registry = PoolRegistry::new();
    let id = registry.open_pool(config.pool.size_bytes, config.pool.policy)?;
    metrics.open_pools.inc();

    let mut driver = WorkloadDriver::new(&config.workload);
    let report = driver.run(registry.pool_mut(id)?, metrics)?;

    registry.close_pool(id)?;
    metrics.open_pools.dec();
    registry.shutdown().map_err(|(_, err)| err)?;
    info!(seed = config.workload.seed, "workload finished");
    Ok(report)
}
