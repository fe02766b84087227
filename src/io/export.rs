//! Sample writers.
//!
//! Output mirrors what [`crate::io::ingest`] reads back: one record per line,
//! fields separated by a single space. `f64` is written with Rust's shortest
//! round-trip representation, so re-ingesting yields the same values.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::hist::Histogram1D;

/// One value per line.
pub fn write_values(path: &Path, values: &[f64]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        writeln!(out, "{v}")?;
    }
    out.flush()?;
    Ok(())
}

/// One row per line.
pub fn write_rows(path: &Path, rows: &[Vec<f64>]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

/// `center content error` per bin with a commented header, for plotting tools.
pub fn write_bin_table(path: &Path, hist: &Histogram1D) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# center content error")?;
    for i in 0..hist.n_bins() {
        writeln!(
            out,
            "{} {} {}",
            hist.bin_center(i),
            hist.bin_content(i).unwrap_or(0.0),
            hist.bin_error(i).unwrap_or(0.0)
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::{read_columns, read_values};

    #[test]
    fn written_values_read_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.txt");
        let values = vec![0.1, -2.5e-9, 3.097, 1.0 / 3.0];
        write_values(&path, &values).unwrap();
        let got = read_values(&path).unwrap();
        assert_eq!(got.records, values);
        assert_eq!(got.report.skipped, 0);
    }

    #[test]
    fn bin_table_has_one_line_per_bin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bins.txt");
        let mut h = Histogram1D::new(4, 0.0, 4.0).unwrap();
        h.fill_all([0.5, 0.5, 2.5]);
        write_bin_table(&path, &h).unwrap();
        let rows = read_columns(&path).unwrap();
        assert_eq!(rows.records.len(), 4);
        assert_eq!(rows.records[0], vec![0.5, 2.0, 2.0_f64.sqrt()]);
        assert_eq!(rows.records[1], vec![1.5, 0.0, 0.0]);
    }

    #[test]
    fn rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.txt");
        let rows = vec![vec![1.0, 2.0], vec![-0.25, 7.5]];
        write_rows(&path, &rows).unwrap();
        assert_eq!(read_columns(&path).unwrap().records, rows);
    }
}
