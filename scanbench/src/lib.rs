//! Scanbench CLI Library
//!
//! Drives an external parallel prefix-scan executable across a matrix of
//! configurations: first a correctness phase that verifies every parallel
//! configuration against the sequential baseline, then timed experiment
//! sweeps whose aggregated results are persisted as binary and CSV
//! artifacts.
//!
//! The correctness phase is a hard gate: if any configuration disagrees
//! with the baseline, the sweeps do not run and the process exits non-zero.

pub mod config;
pub mod correctness;
pub mod runner;
pub mod sweep;

pub use config::HarnessConfig;
pub use correctness::{run_checks, CheckError, CheckMatrix, CheckReport};
pub use runner::{elapsed_micros, time_marker, Algorithm, ProcessRunner, ScanConfig, ScanInvoker};
pub use sweep::{Reducer, SweepSettings, Sweeper, ThreadSweep, WorkloadSweep};

use clap::{Parser, Subcommand};
use scanbench_artifact::{write_artifact, write_csv, SweepTable};
use std::path::{Path, PathBuf};

/// Scanbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "scanbench")]
#[command(author, version, about = "Benchmark-and-correctness harness for a prefix-scan executable")]
pub struct Cli {
    /// Optional subcommand; defaults to Run (check, then sweeps)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: discover scanbench.toml upwards from cwd)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the prefix-scan executable (overrides config)
    #[arg(short, long)]
    pub executable: Option<PathBuf>,

    /// Output directory for sweep artifacts (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Repetitions per sweep point (overrides config)
    #[arg(short, long)]
    pub repetitions: Option<u32>,

    /// Sample reduction policy: sum, mean, median (overrides config)
    #[arg(long)]
    pub reducer: Option<String>,

    /// Settle pause between sweep points in milliseconds (overrides config)
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify parallel configurations against the sequential baseline
    Check,
    /// Run the configured experiment sweeps (skips the correctness gate)
    Sweep,
    /// Run the correctness check, then the sweeps (default)
    Run,
    /// Write a commented default scanbench.toml to the current directory
    Init,
}

/// Run the scanbench CLI. Main entry point for the binary.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the scanbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("scanbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("scanbench=info")
            .init();
    }

    if matches!(cli.command, Some(Commands::Init)) {
        return init_config();
    }

    // Load configuration (CLI flags override file values)
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::discover().unwrap_or_default(),
    };
    apply_overrides(&cli, &mut config)?;

    match cli.command {
        Some(Commands::Check) => {
            check_phase(&config)?;
        }
        Some(Commands::Sweep) => {
            sweep_phase(&config)?;
        }
        Some(Commands::Run) | None => {
            // The check is a hard gate: a mismatch aborts before any sweep
            check_phase(&config)?;
            sweep_phase(&config)?;
        }
        Some(Commands::Init) => unreachable!("handled above"),
    }

    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut HarnessConfig) -> anyhow::Result<()> {
    if let Some(executable) = &cli.executable {
        config.runner.executable = executable.clone();
    }
    if let Some(output) = &cli.output {
        config.runner.output_dir = output.clone();
    }
    if let Some(repetitions) = cli.repetitions {
        config.runner.repetitions = repetitions;
    }
    if let Some(settle_ms) = cli.settle_ms {
        config.runner.settle_ms = settle_ms;
    }
    if let Some(reducer) = &cli.reducer {
        config.runner.reducer = reducer
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }
    Ok(())
}

fn init_config() -> anyhow::Result<()> {
    let path = Path::new("scanbench.toml");
    if path.exists() {
        anyhow::bail!("scanbench.toml already exists, refusing to overwrite");
    }
    std::fs::write(path, HarnessConfig::default_toml())?;
    println!("Wrote scanbench.toml");
    Ok(())
}

fn check_phase(config: &HarnessConfig) -> anyhow::Result<()> {
    let runner = ProcessRunner::new(&config.runner.executable);
    let matrix = config.correctness.to_matrix();

    println!(
        "Checking {} thread count(s) against the sequential baseline...",
        matrix.threads.len()
    );

    let report = run_checks(&runner, &matrix, &config.runner.temp_dir)?;

    println!(
        "Correctness: {} configuration tuple(s) verified, {} run(s) total.",
        report.tuples, report.runs
    );
    Ok(())
}

fn sweep_phase(config: &HarnessConfig) -> anyhow::Result<()> {
    let runner = ProcessRunner::new(&config.runner.executable);
    let sweeper = Sweeper::new(&runner, config.sweep_settings(), &config.runner.temp_dir);

    std::fs::create_dir_all(&config.runner.output_dir)?;

    let mut ran_any = false;

    if let Some(threads) = &config.sweeps.threads {
        let table = sweeper.run_thread_sweep(&threads.to_sweep())?;
        persist_sweep(&config.runner.output_dir, "threads", &table)?;
        ran_any = true;
    }

    if let Some(workload) = &config.sweeps.workload {
        let table = sweeper.run_workload_sweep(&workload.to_sweep())?;
        persist_sweep(&config.runner.output_dir, "workload", &table)?;
        ran_any = true;
    }

    if !ran_any {
        println!("No sweeps configured; nothing to do.");
    }
    Ok(())
}

/// Write the artifact pair for one sweep and echo the table to stdout.
fn persist_sweep(output_dir: &Path, name: &str, table: &SweepTable) -> anyhow::Result<()> {
    let bin_path = output_dir.join(format!("{}.bin", name));
    let csv_path = output_dir.join(format!("{}.csv", name));

    write_artifact(&bin_path, table)?;
    write_csv(&csv_path, table)?;

    println!();
    print!("{}", table.to_csv());
    println!(
        "Wrote {} and {}",
        bin_path.display(),
        csv_path.display()
    );
    Ok(())
}
