//! Plain-text sample ingest.
//!
//! One record per line, fields separated by whitespace and/or commas:
//! - blank lines and lines starting with `#` are ignored (not counted)
//! - a line whose fields do not all parse as finite numbers, or whose field
//!   count does not match the expected width, is skipped and counted
//!
//! Bad lines never abort the pass; the caller gets an [`IngestReport`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{FitError, Result};

/// Skipped line numbers kept in the report.
pub const MAX_REPORTED_LINES: usize = 20;

/// What happened during an ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records accepted.
    pub records: usize,
    /// Lines skipped as malformed.
    pub skipped: usize,
    /// 1-based numbers of the first skipped lines.
    pub skipped_lines: Vec<usize>,
}

impl IngestReport {
    fn skip(&mut self, line: usize, reason: &str) {
        debug!(line, reason, "skipping input line");
        self.skipped += 1;
        if self.skipped_lines.len() < MAX_REPORTED_LINES {
            self.skipped_lines.push(line);
        }
    }
}

/// Parsed records plus the ingest report.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub report: IngestReport,
}

/// One number per line.
pub fn read_values(path: &Path) -> Result<Ingested<f64>> {
    parse_values(open(path)?)
}

/// Two numbers per line (`x y`).
pub fn read_pairs(path: &Path) -> Result<Ingested<(f64, f64)>> {
    parse_pairs(open(path)?)
}

/// Fixed-width rows; the first accepted record sets the width.
pub fn read_columns(path: &Path) -> Result<Ingested<Vec<f64>>> {
    parse_columns(open(path)?, None)
}

/// One column of a multi-column file (0-based).
pub fn read_column(path: &Path, column: usize) -> Result<Ingested<f64>> {
    let rows = read_columns(path)?;
    select_column(rows, column)
}

pub fn parse_values<R: BufRead>(reader: R) -> Result<Ingested<f64>> {
    let rows = parse_columns(reader, Some(1))?;
    select_column(rows, 0)
}

pub fn parse_pairs<R: BufRead>(reader: R) -> Result<Ingested<(f64, f64)>> {
    let rows = parse_columns(reader, Some(2))?;
    let records = rows.records.iter().map(|r| (r[0], r[1])).collect();
    Ok(Ingested { records, report: rows.report })
}

/// Parse rows of `width` fields, or of the first accepted record's width when
/// `width` is `None`.
pub fn parse_columns<R: BufRead>(reader: R, width: Option<usize>) -> Result<Ingested<Vec<f64>>> {
    let mut width = width;
    let mut records = Vec::new();
    let mut report = IngestReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields = match parse_fields(trimmed) {
            Some(f) => f,
            None => {
                report.skip(line_no, "non-numeric field");
                continue;
            }
        };
        match width {
            Some(w) if fields.len() != w => {
                report.skip(line_no, "unexpected field count");
                continue;
            }
            None => width = Some(fields.len()),
            _ => {}
        }
        records.push(fields);
    }

    report.records = records.len();
    if report.skipped > 0 {
        warn!(
            skipped = report.skipped,
            first = ?report.skipped_lines.first(),
            "skipped malformed input lines"
        );
    }
    Ok(Ingested { records, report })
}

fn select_column(rows: Ingested<Vec<f64>>, column: usize) -> Result<Ingested<f64>> {
    if let Some(first) = rows.records.first() {
        if column >= first.len() {
            return Err(FitError::invalid(format!(
                "column {column} out of range: records have {} fields",
                first.len()
            )));
        }
    }
    let records = rows.records.iter().map(|r| r[column]).collect();
    Ok(Ingested { records, report: rows.report })
}

/// All fields as finite numbers, or `None`.
fn parse_fields(line: &str) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    for tok in line.split(|c: char| c == ',' || c.is_whitespace()) {
        if tok.is_empty() {
            continue;
        }
        let v: f64 = tok.parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        out.push(v);
    }
    if out.is_empty() { None } else { Some(out) }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        FitError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open '{}': {e}", path.display()),
        ))
    })?;
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn values_skip_garbage_and_comments() {
        let text = "# mass\n0.5\n\n0.7\nabc\n1.2e-1\nnan\n";
        let got = parse_values(Cursor::new(text)).unwrap();
        assert_eq!(got.records, vec![0.5, 0.7, 0.12]);
        assert_eq!(got.report.records, 3);
        assert_eq!(got.report.skipped, 2);
        assert_eq!(got.report.skipped_lines, vec![5, 7]);
    }

    #[test]
    fn values_reject_multi_field_lines() {
        let got = parse_values(Cursor::new("1.0\n2.0 3.0\n4.0\n")).unwrap();
        assert_eq!(got.records, vec![1.0, 4.0]);
        assert_eq!(got.report.skipped_lines, vec![2]);
    }

    #[test]
    fn pairs_accept_whitespace_or_commas() {
        let got = parse_pairs(Cursor::new("1 2\n3,4\n5 ,  6\n7\n")).unwrap();
        assert_eq!(got.records, vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
        assert_eq!(got.report.skipped, 1);
    }

    #[test]
    fn columns_take_width_from_first_record() {
        let got = parse_columns(Cursor::new("# a b c\n1 2 3\n4 5\n6 7 8\n"), None).unwrap();
        assert_eq!(got.records, vec![vec![1.0, 2.0, 3.0], vec![6.0, 7.0, 8.0]]);
        assert_eq!(got.report.skipped_lines, vec![3]);
    }

    #[test]
    fn skipped_lines_are_capped() {
        let text: String = (0..50).map(|_| "x\n").collect();
        let got = parse_values(Cursor::new(text)).unwrap();
        assert_eq!(got.report.skipped, 50);
        assert_eq!(got.report.skipped_lines.len(), MAX_REPORTED_LINES);
        assert_eq!(got.report.skipped_lines[0], 1);
    }

    #[test]
    fn out_of_range_column_is_invalid() {
        let rows = parse_columns(Cursor::new("1 2\n"), None).unwrap();
        assert!(matches!(select_column(rows, 2), Err(FitError::InvalidParameter(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_values(Path::new("/nonexistent/binfit/input.txt")).unwrap_err();
        assert!(matches!(err, FitError::Io(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
