//! Equal-width binning over a half-open interval.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// `n_bins` equal-width bins over `[lo, hi)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BinningSpec")]
pub struct Binning {
    n_bins: usize,
    lo: f64,
    hi: f64,
}

#[derive(Deserialize)]
struct BinningSpec {
    n_bins: usize,
    lo: f64,
    hi: f64,
}

impl TryFrom<BinningSpec> for Binning {
    type Error = FitError;

    fn try_from(spec: BinningSpec) -> Result<Self> {
        Binning::new(spec.n_bins, spec.lo, spec.hi)
    }
}

impl Binning {
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(FitError::invalid("histogram needs at least one bin"));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(FitError::invalid(format!(
                "histogram range requires finite lo < hi, got [{lo}, {hi})"
            )));
        }
        Ok(Self { n_bins, lo, hi })
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn width(&self) -> f64 {
        (self.hi - self.lo) / self.n_bins as f64
    }

    /// Bin containing `v`, or `None` outside `[lo, hi)` (NaN included).
    pub fn find_bin(&self, v: f64) -> Option<usize> {
        if !(v >= self.lo && v < self.hi) {
            return None;
        }
        let idx = ((v - self.lo) / self.width()) as usize;
        // `v` just below `hi` can round up to `n_bins`.
        Some(idx.min(self.n_bins - 1))
    }

    pub fn low_edge(&self, i: usize) -> f64 {
        if i >= self.n_bins {
            return self.hi;
        }
        self.lo + i as f64 * self.width()
    }

    pub fn center(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.width()
    }

    /// All `n_bins + 1` edges; the last edge is exactly `hi`.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.n_bins).map(|i| self.low_edge(i)).collect()
    }
}
