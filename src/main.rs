//! strbench - Application Entry Point
//!
//! ## Commands
//!
//! - `run`: execute a solver × benchmark-set selection and write tables
//! - `report`: rebuild tables from existing artifacts
//! - `list`: show the registered solvers and benchmark sets

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strbench::{
    config::{Config, LogFormat, Overrides},
    constants::SELECT_ALL,
    BatchOutcome, BatchRunner, Manifest,
};

#[derive(Parser)]
#[command(name = "strbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark harness for string-constraint solvers", long_about = None)]
struct Cli {
    /// Solver and benchmark-set registry (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Root directory for artifacts, tables and run manifests
    #[arg(long, global = true, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute jobs, then collect and aggregate their results
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Wall-clock limit per job in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Address-space ceiling per job in megabytes
        #[arg(long, value_name = "MB")]
        memory_limit_mb: Option<u64>,

        /// Number of concurrent jobs
        #[arg(short, long)]
        workers: Option<usize>,

        /// Do not admit a new job while free memory is below this (0 disables)
        #[arg(long, value_name = "MB")]
        min_free_memory_mb: Option<u64>,

        /// Do not pin concurrent jobs to single cores
        #[arg(long)]
        no_pin: bool,
    },

    /// Rebuild tables from existing artifacts without running solvers
    Report {
        #[command(flatten)]
        selection: Selection,
    },

    /// List registered solvers and benchmark sets
    List,
}

#[derive(Args)]
struct Selection {
    /// Comma-separated solver ids, or `all`
    #[arg(long, default_value = SELECT_ALL)]
    solvers: String,

    /// Comma-separated benchmark-set ids, or `all`
    #[arg(long, default_value = SELECT_ALL)]
    sets: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut overrides = Overrides {
        manifest_path: cli.manifest.clone(),
        results_dir: cli.results_dir.clone(),
        ..Default::default()
    };
    if let Commands::Run {
        timeout,
        memory_limit_mb,
        workers,
        min_free_memory_mb,
        no_pin,
        ..
    } = &cli.command
    {
        overrides.timeout_secs = *timeout;
        overrides.memory_limit_mb = *memory_limit_mb;
        overrides.workers = *workers;
        overrides.min_free_memory_mb = *min_free_memory_mb;
        overrides.no_pin = *no_pin;
    }

    let config = Config::from_env()
        .and_then(|config| config.apply(&overrides))
        .context("Invalid configuration")?;
    init_tracing(&config);

    let manifest = Manifest::load(&config.storage.manifest_path)?;
    tracing::debug!(
        solvers = manifest.solvers.len(),
        sets = manifest.benchmark_sets.len(),
        path = %config.storage.manifest_path.display(),
        "Manifest loaded"
    );

    match cli.command {
        Commands::Run { selection, .. } => {
            tracing::info!(
                solvers = %selection.solvers,
                sets = %selection.sets,
                timeout_secs = config.execution.timeout_secs,
                memory_limit_mb = config.execution.memory_limit_mb,
                workers = config.execution.workers,
                "Starting batch"
            );
            let runner = BatchRunner::new(config, manifest);
            let outcome = runner.run(&selection.solvers, &selection.sets).await?;
            print_outcome(&outcome);
        }
        Commands::Report { selection } => {
            let runner = BatchRunner::new(config, manifest);
            let outcome = runner.report(&selection.solvers, &selection.sets)?;
            print_outcome(&outcome);
        }
        Commands::List => print_manifest(&manifest),
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.rust_log.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_outcome(outcome: &BatchOutcome) {
    for path in &outcome.tables {
        println!("{}", path.display());
    }
    if let Some(path) = &outcome.run_manifest {
        println!("{}", path.display());
    }
}

fn print_manifest(manifest: &Manifest) {
    println!("Solvers:");
    for solver in &manifest.solvers {
        println!(
            "  {:<16} {:<8} {} {}",
            solver.id,
            solver.dialect.as_str(),
            solver.program,
            solver.args.join(" ")
        );
    }
    println!("Benchmark sets:");
    for set in &manifest.benchmark_sets {
        println!("  {:<16} {}", set.id, set.root.display());
    }
}
