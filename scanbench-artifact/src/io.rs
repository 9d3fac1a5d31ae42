//! Artifact Serialization
//!
//! The binary artifact is a single length-prefixed rkyv payload:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | rkyv SweepTable  |
//! +----------------+------------------+
//! ```
//!
//! Payloads are validated with `check_bytes` on read, and capped to guard
//! against reading a corrupt or foreign file. Both the binary and the CSV
//! writers overwrite existing files; artifacts are write-once per run.

use crate::table::SweepTable;
use rkyv::{Deserialize, Infallible};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Maximum artifact payload size (16 MB)
pub const MAX_ARTIFACT_SIZE: usize = 16 * 1024 * 1024;

/// Errors that can occur while writing or reloading artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Artifact too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Row {row} has {got} fields but the header has {expected} columns")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },
}

fn check_shape(table: &SweepTable) -> Result<(), ArtifactError> {
    if let Some(row) = table.misshapen_row() {
        return Err(ArtifactError::ShapeMismatch {
            row,
            expected: table.header.len(),
            got: table.rows[row].width(),
        });
    }
    Ok(())
}

/// Serialize a table to the binary artifact file, overwriting any existing
/// file at `path`.
pub fn write_artifact(path: &Path, table: &SweepTable) -> Result<(), ArtifactError> {
    check_shape(table)?;

    let bytes = rkyv::to_bytes::<_, 256>(table)
        .map_err(|e| ArtifactError::Serialization(e.to_string()))?;

    let len = bytes.len();
    if len > MAX_ARTIFACT_SIZE {
        return Err(ArtifactError::TooLarge {
            size: len,
            max: MAX_ARTIFACT_SIZE,
        });
    }

    let mut file = File::create(path)?;
    file.write_all(&(len as u32).to_le_bytes())?;
    file.write_all(&bytes)?;
    file.flush()?;

    Ok(())
}

/// Reload a table from a binary artifact file.
pub fn read_artifact(path: &Path) -> Result<SweepTable, ArtifactError> {
    let mut file = File::open(path)?;

    let mut len_buf = [0u8; 4];
    file.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_ARTIFACT_SIZE {
        return Err(ArtifactError::TooLarge {
            size: len,
            max: MAX_ARTIFACT_SIZE,
        });
    }
    if len == 0 {
        return Err(ArtifactError::Invalid("zero-length payload".to_string()));
    }

    // Read payload into aligned buffer
    let mut buf = rkyv::AlignedVec::with_capacity(len);
    buf.resize(len, 0);
    file.read_exact(&mut buf)?;

    let archived = rkyv::check_archived_root::<SweepTable>(&buf)
        .map_err(|e| ArtifactError::Deserialization(e.to_string()))?;

    let table: SweepTable = archived
        .deserialize(&mut Infallible)
        .expect("infallible deserialization");

    Ok(table)
}

/// Write the delimited-text form of a table, overwriting any existing file.
pub fn write_csv(path: &Path, table: &SweepTable) -> Result<(), ArtifactError> {
    check_shape(table)?;
    std::fs::write(path, table.to_csv())?;
    Ok(())
}
