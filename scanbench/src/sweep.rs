//! Experiment Sweeps
//!
//! Enumerates Cartesian-product configuration spaces, invokes the external
//! executable once per repetition at every point, and reduces the repeated
//! timing samples to one representative value per point.
//!
//! Two sweep shapes exist:
//! - **Threads-sweep**: thread count varies, everything else held fixed;
//!   one row per (algorithm, input).
//! - **Workload-sweep**: loop count varies across an exponentially-spread
//!   set; one row per (algorithm, thread count).
//!
//! The reducer is explicit and configurable (sum, mean, median) rather than
//! hardcoded per call site. A missing `time:` marker contributes a zero
//! sample; the miss is logged so degraded points stay visible.

use crate::runner::{elapsed_micros, Algorithm, ScanConfig, ScanInvoker};
use indicatif::{ProgressBar, ProgressStyle};
use scanbench_artifact::{SweepRow, SweepTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from the sweep phase
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Exec(#[from] crate::runner::ExecError),

    #[error("Failed to create temp directory {}: {}", .path.display(), .source)]
    TempDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Reduction of repeated noisy timing samples to one representative value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reducer {
    /// Raw sum of all samples
    Sum,
    /// Arithmetic mean (default)
    #[default]
    Mean,
    /// Middle sample (mean of the two middle samples for even counts)
    Median,
}

impl Reducer {
    /// Reduce a sample set. Empty input reduces to 0.
    pub fn reduce(self, samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        match self {
            Reducer::Sum => samples.iter().sum(),
            Reducer::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
            Reducer::Median => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).expect("timing samples are finite"));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        }
    }
}

impl std::str::FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "mean" | "avg" | "average" => Ok(Reducer::Mean),
            "median" => Ok(Reducer::Median),
            other => Err(format!("Unknown reducer: {}", other)),
        }
    }
}

/// Per-sweep measurement policy
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Repetitions per sweep point
    pub repetitions: u32,
    /// Pause between points, letting transient system load settle
    pub settle: Duration,
    /// Sample reduction policy
    pub reducer: Reducer,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            repetitions: 4,
            settle: Duration::from_millis(500),
            reducer: Reducer::default(),
        }
    }
}

/// Threads-sweep shape: thread count varies across a dense range
#[derive(Debug, Clone)]
pub struct ThreadSweep {
    pub threads: Vec<u32>,
    pub loops: u32,
    pub inputs: Vec<PathBuf>,
    pub algorithms: Vec<Algorithm>,
    pub spin: bool,
}

/// Workload-sweep shape: loop count varies across an exponentially-spread set
#[derive(Debug, Clone)]
pub struct WorkloadSweep {
    pub loops: Vec<u32>,
    pub threads: Vec<u32>,
    pub input: PathBuf,
    pub algorithms: Vec<Algorithm>,
    pub spin: bool,
}

/// Runs sweeps over a `ScanInvoker`, strictly sequentially
pub struct Sweeper<'a, I: ScanInvoker> {
    invoker: &'a I,
    settings: SweepSettings,
    temp_dir: PathBuf,
}

impl<'a, I: ScanInvoker> Sweeper<'a, I> {
    pub fn new(invoker: &'a I, settings: SweepSettings, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            settings,
            temp_dir: temp_dir.into(),
        }
    }

    fn scratch_file(&self) -> Result<PathBuf, SweepError> {
        std::fs::create_dir_all(&self.temp_dir).map_err(|source| SweepError::TempDir {
            path: self.temp_dir.clone(),
            source,
        })?;
        Ok(self.temp_dir.join("sweep-scratch.txt"))
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Run one sweep point: `repetitions` invocations, reduced to one value.
    /// A repetition whose output lacks the timing marker contributes 0.
    fn measure_point(&self, config: &ScanConfig, scratch: &Path) -> Result<f64, SweepError> {
        let mut samples = Vec::with_capacity(self.settings.repetitions as usize);
        for _ in 0..self.settings.repetitions {
            let run = self.invoker.invoke(config, scratch)?;
            match elapsed_micros(&run.stdout) {
                Some(micros) => samples.push(micros as f64),
                None => {
                    tracing::warn!(
                        threads = config.threads,
                        loops = config.loops,
                        "timing marker missing, recording zero sample"
                    );
                    samples.push(0.0);
                }
            }
        }
        if !self.settings.settle.is_zero() {
            std::thread::sleep(self.settings.settle);
        }
        Ok(self.settings.reducer.reduce(&samples))
    }

    /// Sweep over thread counts. Header: `algorithm, input, <threads...>`;
    /// one row per (algorithm, input), in enumeration order.
    pub fn run_thread_sweep(&self, sweep: &ThreadSweep) -> Result<SweepTable, SweepError> {
        let scratch = self.scratch_file()?;

        let mut header = vec!["algorithm".to_string(), "input".to_string()];
        header.extend(sweep.threads.iter().map(|t| t.to_string()));
        let mut table = SweepTable::new(header);

        let total = (sweep.algorithms.len() * sweep.inputs.len() * sweep.threads.len()) as u64;
        let pb = Self::progress_bar(total);

        for &algorithm in &sweep.algorithms {
            for input in &sweep.inputs {
                pb.set_message(format!("{}/{}", algorithm.name(), input.display()));

                let mut values = Vec::with_capacity(sweep.threads.len());
                for &threads in &sweep.threads {
                    let config = ScanConfig {
                        threads,
                        loops: sweep.loops,
                        input: input.clone(),
                        algorithm: Some(algorithm),
                        spin: sweep.spin,
                    };
                    values.push(self.measure_point(&config, &scratch)?);
                    pb.inc(1);
                }

                table.push(SweepRow {
                    labels: vec![algorithm.name().to_string(), input.display().to_string()],
                    values,
                });
            }
        }

        pb.finish_with_message("threads sweep complete");
        Ok(table)
    }

    /// Sweep over loop counts. Header: `algorithm, threads, <loops...>`;
    /// one row per (algorithm, thread count), in enumeration order.
    pub fn run_workload_sweep(&self, sweep: &WorkloadSweep) -> Result<SweepTable, SweepError> {
        let scratch = self.scratch_file()?;

        let mut header = vec!["algorithm".to_string(), "threads".to_string()];
        header.extend(sweep.loops.iter().map(|l| l.to_string()));
        let mut table = SweepTable::new(header);

        let total = (sweep.algorithms.len() * sweep.threads.len() * sweep.loops.len()) as u64;
        let pb = Self::progress_bar(total);

        for &algorithm in &sweep.algorithms {
            for &threads in &sweep.threads {
                pb.set_message(format!("{}/{} threads", algorithm.name(), threads));

                let mut values = Vec::with_capacity(sweep.loops.len());
                for &loops in &sweep.loops {
                    let config = ScanConfig {
                        threads,
                        loops,
                        input: sweep.input.clone(),
                        algorithm: Some(algorithm),
                        spin: sweep.spin,
                    };
                    values.push(self.measure_point(&config, &scratch)?);
                    pb.inc(1);
                }

                table.push(SweepRow {
                    labels: vec![algorithm.name().to_string(), threads.to_string()],
                    values,
                });
            }
        }

        pb.finish_with_message("workload sweep complete");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ExecError, RunOutput};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays a fixed queue of timing values (None = marker absent)
    struct QueuedInvoker {
        times: RefCell<VecDeque<Option<u64>>>,
    }

    impl QueuedInvoker {
        fn new(times: impl IntoIterator<Item = Option<u64>>) -> Self {
            Self {
                times: RefCell::new(times.into_iter().collect()),
            }
        }
    }

    impl ScanInvoker for QueuedInvoker {
        fn invoke(&self, _config: &ScanConfig, out_file: &Path) -> Result<RunOutput, ExecError> {
            let stdout = match self.times.borrow_mut().pop_front().expect("queue exhausted") {
                Some(t) => format!("time: {}\n", t),
                None => "no timing produced\n".to_string(),
            };
            Ok(RunOutput {
                stdout,
                out_file: out_file.to_path_buf(),
            })
        }
    }

    /// Derives the reported time from the configuration
    struct DerivedInvoker<F: Fn(&ScanConfig) -> u64> {
        time: F,
    }

    impl<F: Fn(&ScanConfig) -> u64> ScanInvoker for DerivedInvoker<F> {
        fn invoke(&self, config: &ScanConfig, out_file: &Path) -> Result<RunOutput, ExecError> {
            Ok(RunOutput {
                stdout: format!("time: {}\n", (self.time)(config)),
                out_file: out_file.to_path_buf(),
            })
        }
    }

    fn test_settings(repetitions: u32, reducer: Reducer) -> SweepSettings {
        SweepSettings {
            repetitions,
            settle: Duration::ZERO,
            reducer,
        }
    }

    #[test]
    fn test_reducers() {
        let samples = [10.0, 12.0, 20.0];
        assert_eq!(Reducer::Sum.reduce(&samples), 42.0);
        assert_eq!(Reducer::Mean.reduce(&samples), 14.0);
        assert_eq!(Reducer::Median.reduce(&samples), 12.0);
        assert_eq!(Reducer::Median.reduce(&[10.0, 12.0, 20.0, 30.0]), 16.0);
        assert_eq!(Reducer::Mean.reduce(&[]), 0.0);
    }

    #[test]
    fn test_thread_sweep_averages_repetitions() {
        // Threads {0, 2, 4}, 2 repetitions, timings [10,12], [20,18], [30,34]
        let invoker = QueuedInvoker::new([10, 12, 20, 18, 30, 34].map(Some));
        let dir = tempfile::tempdir().unwrap();
        let sweeper = Sweeper::new(&invoker, test_settings(2, Reducer::Mean), dir.path());

        let table = sweeper
            .run_thread_sweep(&ThreadSweep {
                threads: vec![0, 2, 4],
                loops: 10,
                inputs: vec![PathBuf::from("seq_64_test.txt")],
                algorithms: vec![Algorithm::BlockSequentialSum],
                spin: false,
            })
            .unwrap();

        assert_eq!(
            table.header,
            ["algorithm", "input", "0", "2", "4"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].labels[0], "block-sequential-sum");
        assert_eq!(table.rows[0].values, [11.0, 19.0, 32.0]);
    }

    #[test]
    fn test_workload_sweep_sum_single_repetition() {
        let invoker = DerivedInvoker {
            time: |config: &ScanConfig| u64::from(config.loops) * 2,
        };
        let dir = tempfile::tempdir().unwrap();
        let sweeper = Sweeper::new(&invoker, test_settings(1, Reducer::Sum), dir.path());

        let table = sweeper
            .run_workload_sweep(&WorkloadSweep {
                loops: vec![10, 100, 1000],
                threads: vec![0],
                input: PathBuf::from("seq_64_test.txt"),
                algorithms: vec![Algorithm::TreeSum],
                spin: false,
            })
            .unwrap();

        assert_eq!(table.header, ["algorithm", "threads", "10", "100", "1000"]);
        assert_eq!(table.rows[0].labels, ["tree-sum", "0"]);
        assert_eq!(table.rows[0].values, [20.0, 200.0, 2000.0]);
    }

    #[test]
    fn test_workload_sweep_mean_multiple_repetitions() {
        // Two repetitions of identical derived timings: mean equals one rep,
        // sum doubles it. Verifies the reducer choice reaches the record.
        let invoker = DerivedInvoker {
            time: |config: &ScanConfig| u64::from(config.loops) * 2,
        };
        let dir = tempfile::tempdir().unwrap();

        let sweep = WorkloadSweep {
            loops: vec![10, 100, 1000],
            threads: vec![0],
            input: PathBuf::from("seq_64_test.txt"),
            algorithms: vec![Algorithm::TreeSum],
            spin: false,
        };

        let mean = Sweeper::new(&invoker, test_settings(2, Reducer::Mean), dir.path())
            .run_workload_sweep(&sweep)
            .unwrap();
        assert_eq!(mean.rows[0].values, [20.0, 200.0, 2000.0]);

        let sum = Sweeper::new(&invoker, test_settings(2, Reducer::Sum), dir.path())
            .run_workload_sweep(&sweep)
            .unwrap();
        assert_eq!(sum.rows[0].values, [40.0, 400.0, 4000.0]);
    }

    #[test]
    fn test_missing_marker_records_zero_sample() {
        // Second repetition has no marker: mean of [10, 0] is 5
        let invoker = QueuedInvoker::new([Some(10), None]);
        let dir = tempfile::tempdir().unwrap();
        let sweeper = Sweeper::new(&invoker, test_settings(2, Reducer::Mean), dir.path());

        let table = sweeper
            .run_thread_sweep(&ThreadSweep {
                threads: vec![0],
                loops: 10,
                inputs: vec![PathBuf::from("in.txt")],
                algorithms: vec![Algorithm::BlockParallelSum],
                spin: false,
            })
            .unwrap();

        assert_eq!(table.rows[0].values, [5.0]);
    }

    #[test]
    fn test_enumeration_order_preserved() {
        let invoker = DerivedInvoker {
            time: |config: &ScanConfig| u64::from(config.threads),
        };
        let dir = tempfile::tempdir().unwrap();
        let sweeper = Sweeper::new(&invoker, test_settings(1, Reducer::Sum), dir.path());

        let table = sweeper
            .run_thread_sweep(&ThreadSweep {
                threads: vec![0, 2],
                loops: 10,
                inputs: vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
                algorithms: vec![Algorithm::BlockSequentialSum, Algorithm::TreeSum],
                spin: false,
            })
            .unwrap();

        // Outer axis (algorithm) iterates before inner axis (input)
        let labels: Vec<_> = table.rows.iter().map(|r| r.labels.clone()).collect();
        assert_eq!(
            labels,
            [
                ["block-sequential-sum", "a.txt"],
                ["block-sequential-sum", "b.txt"],
                ["tree-sum", "a.txt"],
                ["tree-sum", "b.txt"],
            ]
        );
    }
}
