//! Sweep Result Tables
//!
//! A `SweepTable` is the finalized output of one experiment sweep: a header
//! naming the fixed label columns and the swept values, plus one row per
//! (label, swept-axis) combination. Rows are kept in enumeration order; the
//! order is significant because the schema is positional.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One row of an aggregated sweep: fixed label fields followed by one reduced
/// timing value per swept point.
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct SweepRow {
    /// Fixed descriptive fields (e.g. algorithm name, input name)
    pub labels: Vec<String>,
    /// Reduced timing values, one per swept point, in sweep order
    pub values: Vec<f64>,
}

impl SweepRow {
    /// Number of fields this row renders in the delimited form
    pub fn width(&self) -> usize {
        self.labels.len() + self.values.len()
    }
}

/// An ordered collection of sweep rows under a shared header.
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct SweepTable {
    /// Column labels: fixed descriptive columns first, then the swept values
    pub header: Vec<String>,
    /// Data rows in enumeration order
    pub rows: Vec<SweepRow>,
}

impl SweepTable {
    /// Create an empty table under the given header
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Append a row, preserving insertion order
    pub fn push(&mut self, row: SweepRow) {
        self.rows.push(row);
    }

    /// Index of the first row whose width disagrees with the header, if any
    pub fn misshapen_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.width() != self.header.len())
    }

    /// Render the delimited-text form: header line first, then one line per
    /// row, fields joined with `", "`. Deterministic for a given table.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header.join(", "));
        out.push('\n');
        for row in &self.rows {
            let mut fields: Vec<String> = row.labels.clone();
            fields.extend(row.values.iter().map(|v| format_value(*v)));
            out.push_str(&fields.join(", "));
            out.push('\n');
        }
        out
    }
}

/// Format a reduced timing value without locale dependence.
///
/// Whole values print as integers (the executable reports integral
/// microseconds, so sums and many means stay whole); fractional values use
/// the default `f64` rendering, which is shortest-roundtrip and stable.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SweepTable {
        let mut table = SweepTable::new(vec![
            "algorithm".to_string(),
            "input".to_string(),
            "0".to_string(),
            "2".to_string(),
        ]);
        table.push(SweepRow {
            labels: vec!["tree-sum".to_string(), "seq_64_test.txt".to_string()],
            values: vec![11.0, 19.5],
        });
        table.push(SweepRow {
            labels: vec!["block-parallel-sum".to_string(), "seq_64_test.txt".to_string()],
            values: vec![14.0, 32.0],
        });
        table
    }

    #[test]
    fn test_csv_layout() {
        let csv = sample_table().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "algorithm, input, 0, 2");
        assert_eq!(lines[1], "tree-sum, seq_64_test.txt, 11, 19.5");
        assert_eq!(lines[2], "block-parallel-sum, seq_64_test.txt, 14, 32");
    }

    #[test]
    fn test_csv_deterministic() {
        let table = sample_table();
        assert_eq!(table.to_csv(), table.to_csv());
    }

    #[test]
    fn test_misshapen_row_detected() {
        let mut table = sample_table();
        assert_eq!(table.misshapen_row(), None);
        table.push(SweepRow {
            labels: vec!["tree-sum".to_string()],
            values: vec![1.0],
        });
        assert_eq!(table.misshapen_row(), Some(2));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(11.25), "11.25");
        assert_eq!(format_value(-3.0), "-3");
    }
}
