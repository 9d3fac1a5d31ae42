//! Correctness Verification
//!
//! Before any timing sweep runs, every parallel configuration must produce
//! output byte-identical to the sequential baseline (thread count 0).
//! Comparison is textual and exact: the scan is deterministic, so any
//! formatting difference across concurrency levels is a correctness failure.
//!
//! A mismatch is fatal. Benchmarking a broken implementation wastes time and
//! produces misleading numbers, so the orchestrator short-circuits the
//! remaining phases when this module reports an error.

use crate::runner::{Algorithm, ScanConfig, ScanInvoker};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the verification phase
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Thread list must start with the sequential baseline (thread count 0), got {0:?}")]
    MissingBaseline(Vec<u32>),

    #[error("Correctness matrix has no thread counts")]
    EmptyThreads,

    #[error(transparent)]
    Exec(#[from] crate::runner::ExecError),

    #[error("Failed to read run output {}: {}", .path.display(), .source)]
    ReadOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create temp directory {}: {}", .path.display(), .source)]
    TempDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Scan results are not consistent: {} differs from baseline {}",
        .candidate.display(),
        .baseline.display()
    )]
    Mismatch {
        baseline: PathBuf,
        candidate: PathBuf,
    },
}

/// The configuration space verified against the baseline. The outer product
/// of (input, loops, algorithm, spin) forms the tuples; within each tuple all
/// thread counts run before any comparison happens.
#[derive(Debug, Clone)]
pub struct CheckMatrix {
    /// Thread counts; the first entry MUST be 0 (explicit precondition)
    pub threads: Vec<u32>,
    pub loops: Vec<u32>,
    pub inputs: Vec<PathBuf>,
    pub algorithms: Vec<Algorithm>,
    pub spin_modes: Vec<bool>,
}

/// What a successful check covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    /// (input, loops, algorithm, spin) tuples verified
    pub tuples: usize,
    /// Total external invocations
    pub runs: usize,
}

/// Run the full verification matrix. Each thread count writes to a distinct
/// `temp-<n>.txt` under `temp_dir`; files are compared after every run of a
/// tuple completes, and left on disk afterwards.
///
/// Returns the first failure encountered. Tuples already verified are not
/// invalidated by a later mismatch.
pub fn run_checks<I: ScanInvoker>(
    invoker: &I,
    matrix: &CheckMatrix,
    temp_dir: &Path,
) -> Result<CheckReport, CheckError> {
    match matrix.threads.first() {
        None => return Err(CheckError::EmptyThreads),
        Some(0) => {}
        Some(_) => return Err(CheckError::MissingBaseline(matrix.threads.clone())),
    }

    std::fs::create_dir_all(temp_dir).map_err(|source| CheckError::TempDir {
        path: temp_dir.to_path_buf(),
        source,
    })?;

    let mut report = CheckReport { tuples: 0, runs: 0 };

    for input in &matrix.inputs {
        for &loops in &matrix.loops {
            for &spin in &matrix.spin_modes {
                for &algorithm in &matrix.algorithms {
                    tracing::info!(
                        input = %input.display(),
                        loops,
                        spin,
                        algorithm = algorithm.name(),
                        "checking tuple"
                    );

                    for &threads in &matrix.threads {
                        let config = ScanConfig {
                            threads,
                            loops,
                            input: input.clone(),
                            algorithm: Some(algorithm),
                            spin,
                        };
                        invoker.invoke(&config, &temp_file(temp_dir, threads))?;
                        report.runs += 1;
                    }

                    compare_to_baseline(temp_dir, &matrix.threads)?;
                    report.tuples += 1;
                }
            }
        }
    }

    Ok(report)
}

fn temp_file(temp_dir: &Path, threads: u32) -> PathBuf {
    temp_dir.join(format!("temp-{}.txt", threads))
}

fn read_output(path: &Path) -> Result<String, CheckError> {
    std::fs::read_to_string(path).map_err(|source| CheckError::ReadOutput {
        path: path.to_path_buf(),
        source,
    })
}

/// Byte-compare every non-baseline output file against the baseline file.
/// No tolerance, no normalization.
fn compare_to_baseline(temp_dir: &Path, threads: &[u32]) -> Result<(), CheckError> {
    let baseline_path = temp_file(temp_dir, threads[0]);
    let baseline = read_output(&baseline_path)?;

    for &t in &threads[1..] {
        let candidate_path = temp_file(temp_dir, t);
        let candidate = read_output(&candidate_path)?;
        if candidate != baseline {
            return Err(CheckError::Mismatch {
                baseline: baseline_path,
                candidate: candidate_path,
            });
        }
    }

    Ok(())
}
