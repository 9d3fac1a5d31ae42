//! Scanbench Artifact - Sweep Result Tables
//!
//! Data model for aggregated sweep results and their two on-disk forms:
//! - a length-prefixed rkyv binary artifact (machine-readable)
//! - a comma-and-space delimited text file (human-readable)
//!
//! The schema is positional: a header row followed by data rows, with no
//! embedded type tags. Consumers must know the producing sweep's axis order.

mod io;
mod table;

pub use io::{read_artifact, write_artifact, write_csv, ArtifactError, MAX_ARTIFACT_SIZE};
pub use table::{format_value, SweepRow, SweepTable};
