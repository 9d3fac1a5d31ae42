//! Process Invocation
//!
//! Launches the external prefix-scan executable with a fully specified
//! argument set, synchronously, and captures its standard output. All
//! invocations are strictly sequential by design: a benchmark process must
//! run to completion before the next one starts, or the timing measurements
//! would contaminate each other.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use thiserror::Error;

/// Errors from launching or completing an external invocation
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start {}: {}", .executable.display(), .source)]
    Spawn {
        executable: PathBuf,
        source: std::io::Error,
    },

    #[error("{} exited with {}: {}", .executable.display(), .status, .stderr)]
    NonZeroExit {
        executable: PathBuf,
        status: String,
        stderr: String,
    },
}

/// Scan algorithm variant selected via the executable's `-a` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// `-a 0`: per-thread blocks, sequential block-sum pass
    BlockSequentialSum,
    /// `-a 1`: per-thread blocks, parallel block-sum pass
    BlockParallelSum,
    /// `-a 2`: tree-structured sum
    TreeSum,
}

impl Algorithm {
    /// Value passed to the executable's `-a` flag
    pub fn flag(self) -> u32 {
        match self {
            Algorithm::BlockSequentialSum => 0,
            Algorithm::BlockParallelSum => 1,
            Algorithm::TreeSum => 2,
        }
    }

    /// Name used in row labels and artifact headers
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::BlockSequentialSum => "block-sequential-sum",
            Algorithm::BlockParallelSum => "block-parallel-sum",
            Algorithm::TreeSum => "tree-sum",
        }
    }
}

/// One immutable invocation configuration. Thread count 0 selects the
/// executable's sequential code path and serves as the correctness baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub threads: u32,
    pub loops: u32,
    pub input: PathBuf,
    pub algorithm: Option<Algorithm>,
    pub spin: bool,
}

impl ScanConfig {
    /// Build the executable's argument list for this configuration
    pub fn args(&self, out_file: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec![
            "-o".into(),
            out_file.into(),
            "-n".into(),
            self.threads.to_string().into(),
            "-i".into(),
            self.input.clone().into(),
            "-l".into(),
            self.loops.to_string().into(),
        ];
        if let Some(algorithm) = self.algorithm {
            args.push("-a".into());
            args.push(algorithm.flag().to_string().into());
        }
        if self.spin {
            args.push("-s".into());
        }
        args
    }
}

/// Outcome of one invocation: captured stdout plus the output file the
/// executable was asked to write. Consumed immediately by the caller.
#[derive(Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub out_file: PathBuf,
}

/// Seam between the harness and the external program. The production
/// implementation spawns a real process; tests substitute scripted invokers.
pub trait ScanInvoker {
    /// Run one configuration to completion, directing program output to
    /// `out_file`, and return the captured stdout.
    fn invoke(&self, config: &ScanConfig, out_file: &Path) -> Result<RunOutput, ExecError>;
}

/// Invokes the real external executable
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Path of the executable this runner launches
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl ScanInvoker for ProcessRunner {
    fn invoke(&self, config: &ScanConfig, out_file: &Path) -> Result<RunOutput, ExecError> {
        let args = config.args(out_file);
        tracing::debug!(executable = %self.executable.display(), ?args, "invoking");

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecError::NonZeroExit {
                executable: self.executable.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            out_file: out_file.to_path_buf(),
        })
    }
}

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"time: (.*)").expect("valid regex"))
}

/// Substring following the `time: ` marker, or `None` if the marker is
/// absent. Tolerant by design: malformed output degrades one data point, it
/// never aborts a sweep.
pub fn time_marker(stdout: &str) -> Option<&str> {
    time_regex()
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Reported elapsed time in microseconds, if the marker is present and its
/// value parses as an integer.
pub fn elapsed_micros(stdout: &str) -> Option<u64> {
    time_marker(stdout)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_full() {
        let config = ScanConfig {
            threads: 4,
            loops: 100000,
            input: PathBuf::from("tests/seq_64_test.txt"),
            algorithm: Some(Algorithm::TreeSum),
            spin: true,
        };
        let args = config.args(Path::new("temp/temp-4.txt"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-o",
                "temp/temp-4.txt",
                "-n",
                "4",
                "-i",
                "tests/seq_64_test.txt",
                "-l",
                "100000",
                "-a",
                "2",
                "-s"
            ]
        );
    }

    #[test]
    fn test_args_minimal() {
        let config = ScanConfig {
            threads: 0,
            loops: 10,
            input: PathBuf::from("in.txt"),
            algorithm: None,
            spin: false,
        };
        let args = config.args(Path::new("out.txt"));
        assert_eq!(args.len(), 8);
        assert!(!args.contains(&"-a".into()));
        assert!(!args.contains(&"-s".into()));
    }

    #[test]
    fn test_time_marker_present() {
        let stdout = "some banner\ntime: 1234\ndone\n";
        assert_eq!(time_marker(stdout), Some("1234"));
        assert_eq!(elapsed_micros(stdout), Some(1234));
    }

    #[test]
    fn test_time_marker_absent() {
        assert_eq!(time_marker("no timing here\n"), None);
        assert_eq!(elapsed_micros(""), None);
    }

    #[test]
    fn test_time_marker_malformed() {
        // Marker present but not an integer: the exact substring is still
        // reported, the parsed value is not.
        let stdout = "time: banana\n";
        assert_eq!(time_marker(stdout), Some("banana"));
        assert_eq!(elapsed_micros(stdout), None);
    }

    #[test]
    fn test_spawn_failure() {
        let runner = ProcessRunner::new("/nonexistent/prefix_scan");
        let config = ScanConfig {
            threads: 0,
            loops: 10,
            input: PathBuf::from("in.txt"),
            algorithm: None,
            spin: false,
        };
        let err = runner.invoke(&config, Path::new("out.txt")).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_algorithm_flags() {
        assert_eq!(Algorithm::BlockSequentialSum.flag(), 0);
        assert_eq!(Algorithm::BlockParallelSum.flag(), 1);
        assert_eq!(Algorithm::TreeSum.flag(), 2);
    }
}
