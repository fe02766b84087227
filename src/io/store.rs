//! JSON store for histograms and fit results.
//!
//! Floats are written with `serde_json`'s round-trip formatting, so bin edges
//! and contents reload bit-for-bit. Histograms are re-validated on load.
//!
//! A [`FitArchive`] bundles everything an external plotting tool needs:
//! - the histogram that was fitted
//! - the fit result
//! - a precomputed curve over the fit range

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{CurveGrid, FitResult};
use crate::error::Result;
use crate::hist::{Histogram1D, Histogram2D};

/// Points in an archived curve.
pub const ARCHIVE_CURVE_POINTS: usize = 201;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitArchive {
    pub tool: String,
    pub histogram: Histogram1D,
    pub fit: FitResult,
    pub curve: CurveGrid,
}

impl FitArchive {
    pub fn new(histogram: Histogram1D, fit: FitResult) -> Self {
        let curve = fit.curve(ARCHIVE_CURVE_POINTS);
        Self {
            tool: "binfit".to_string(),
            histogram,
            fit,
            curve,
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}

pub fn read_histogram1d(path: &Path) -> Result<Histogram1D> {
    let h: Histogram1D = read_json(path)?;
    h.validate()?;
    Ok(h)
}

pub fn read_histogram2d(path: &Path) -> Result<Histogram2D> {
    let h: Histogram2D = read_json(path)?;
    h.validate()?;
    Ok(h)
}

pub fn read_fit_archive(path: &Path) -> Result<FitArchive> {
    let archive: FitArchive = read_json(path)?;
    archive.histogram.validate()?;
    archive.fit.model.check_params(&archive.fit.values())?;
    Ok(archive)
}
