//! Configuration loading from scanbench.toml
//!
//! The harness configuration lives in a `scanbench.toml` discovered by
//! walking up from the current directory. Every section has defaults; CLI
//! flags override file values.

use crate::correctness::CheckMatrix;
use crate::runner::Algorithm;
use crate::sweep::{Reducer, SweepSettings, ThreadSweep, WorkloadSweep};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Correctness matrix
    #[serde(default)]
    pub correctness: CorrectnessConfig,
    /// Sweep definitions
    #[serde(default)]
    pub sweeps: SweepsConfig,
}

/// Runner configuration: where the executable lives and how points are
/// measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path to the prefix-scan executable under test
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Directory for transient run output files
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Directory for sweep artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Repetitions per sweep point
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Settle pause between sweep points, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Sample reduction policy: "sum", "mean", or "median"
    #[serde(default)]
    pub reducer: Reducer,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            temp_dir: default_temp_dir(),
            output_dir: default_output_dir(),
            repetitions: default_repetitions(),
            settle_ms: default_settle_ms(),
            reducer: Reducer::default(),
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("bin/prefix_scan")
}
fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_repetitions() -> u32 {
    4
}
fn default_settle_ms() -> u64 {
    500
}

/// Correctness-check matrix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectnessConfig {
    /// Thread counts; must start with 0 (the sequential baseline)
    #[serde(default = "default_check_threads")]
    pub threads: Vec<u32>,
    #[serde(default = "default_check_loops")]
    pub loops: Vec<u32>,
    #[serde(default = "default_inputs")]
    pub inputs: Vec<PathBuf>,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    /// Spin-wait modes to cover (false = blocking synchronization)
    #[serde(default = "default_spin_modes")]
    pub spin_modes: Vec<bool>,
}

impl Default for CorrectnessConfig {
    fn default() -> Self {
        Self {
            threads: default_check_threads(),
            loops: default_check_loops(),
            inputs: default_inputs(),
            algorithms: default_algorithms(),
            spin_modes: default_spin_modes(),
        }
    }
}

fn default_check_threads() -> Vec<u32> {
    vec![0, 2, 15]
}
fn default_check_loops() -> Vec<u32> {
    vec![10]
}
fn default_inputs() -> Vec<PathBuf> {
    vec![PathBuf::from("tests/seq_64_test.txt")]
}
fn default_algorithms() -> Vec<Algorithm> {
    vec![
        Algorithm::BlockSequentialSum,
        Algorithm::BlockParallelSum,
        Algorithm::TreeSum,
    ]
}
fn default_spin_modes() -> Vec<bool> {
    vec![false]
}

impl CorrectnessConfig {
    /// Build the checker's matrix from this configuration
    pub fn to_matrix(&self) -> CheckMatrix {
        CheckMatrix {
            threads: self.threads.clone(),
            loops: self.loops.clone(),
            inputs: self.inputs.clone(),
            algorithms: self.algorithms.clone(),
            spin_modes: self.spin_modes.clone(),
        }
    }
}

/// Sweep definitions; either shape may be omitted
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepsConfig {
    /// Threads-sweep definition
    #[serde(default)]
    pub threads: Option<ThreadSweepConfig>,
    /// Workload-sweep definition
    #[serde(default)]
    pub workload: Option<WorkloadSweepConfig>,
}

/// Threads-sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSweepConfig {
    /// Swept thread counts (dense range, sequential baseline included)
    #[serde(default = "default_sweep_threads")]
    pub threads: Vec<u32>,
    #[serde(default = "default_sweep_loops")]
    pub loops: u32,
    #[serde(default = "default_inputs")]
    pub inputs: Vec<PathBuf>,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    #[serde(default)]
    pub spin: bool,
}

fn default_sweep_threads() -> Vec<u32> {
    (0..=16).step_by(2).collect()
}
fn default_sweep_loops() -> u32 {
    10
}

impl ThreadSweepConfig {
    pub fn to_sweep(&self) -> ThreadSweep {
        ThreadSweep {
            threads: self.threads.clone(),
            loops: self.loops,
            inputs: self.inputs.clone(),
            algorithms: self.algorithms.clone(),
            spin: self.spin,
        }
    }
}

/// Workload-sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSweepConfig {
    /// Swept loop counts (exponentially spread)
    #[serde(default = "default_workload_loops")]
    pub loops: Vec<u32>,
    /// Fixed thread counts, one row each
    #[serde(default = "default_workload_threads")]
    pub threads: Vec<u32>,
    #[serde(default = "default_workload_input")]
    pub input: PathBuf,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    #[serde(default)]
    pub spin: bool,
}

fn default_workload_loops() -> Vec<u32> {
    vec![10, 100, 1_000, 10_000, 100_000]
}
fn default_workload_threads() -> Vec<u32> {
    vec![0, 8]
}
fn default_workload_input() -> PathBuf {
    PathBuf::from("tests/seq_64_test.txt")
}

impl WorkloadSweepConfig {
    pub fn to_sweep(&self) -> WorkloadSweep {
        WorkloadSweep {
            loops: self.loops.clone(),
            threads: self.threads.clone(),
            input: self.input.clone(),
            algorithms: self.algorithms.clone(),
            spin: self.spin,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from the
    /// current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("scanbench.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Measurement settings derived from the runner section
    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            repetitions: self.runner.repetitions,
            settle: Duration::from_millis(self.runner.settle_ms),
            reducer: self.runner.reducer,
        }
    }

    /// Generate a default configuration as a TOML string
    pub fn default_toml() -> String {
        r#"# scanbench configuration

[runner]
# Path to the prefix-scan executable under test
executable = "bin/prefix_scan"
# Directory for transient run output files (left on disk, not cleaned)
temp_dir = "temp"
# Directory for sweep artifacts (.bin + .csv, overwritten on rerun)
output_dir = "results"
# Repetitions per sweep point
repetitions = 4
# Settle pause between sweep points, in milliseconds
settle_ms = 500
# Sample reduction policy: "sum", "mean", or "median"
reducer = "mean"

[correctness]
# Thread counts; 0 (the sequential baseline) must come first
threads = [0, 2, 15]
loops = [10]
inputs = ["tests/seq_64_test.txt"]
algorithms = ["block-sequential-sum", "block-parallel-sum", "tree-sum"]
# Synchronization modes to cover (true = spin-wait)
spin_modes = [false]

[sweeps.threads]
threads = [0, 2, 4, 6, 8, 10, 12, 14, 16]
loops = 10
inputs = ["tests/seq_64_test.txt"]
algorithms = ["block-sequential-sum", "block-parallel-sum", "tree-sum"]
spin = false

[sweeps.workload]
loops = [10, 100, 1000, 10000, 100000]
threads = [0, 8]
input = "tests/seq_64_test.txt"
algorithms = ["tree-sum"]
spin = false
"#
        .to_string()
    }
}
