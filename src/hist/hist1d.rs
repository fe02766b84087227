//! One-dimensional weighted histogram.
//!
//! Each bin keeps the sum of weights and the sum of squared weights. Weights
//! are non-negative, so contents are too. The statistical term is
//! `sqrt(max(Σw², Σw))`: `sqrt(N)` for unit weights, the weighted spread when
//! weights exceed one, and never below `sqrt(content)`. It is combined in
//! quadrature with an optional fractional systematic:
//!
//! ```text
//! error = sqrt(max(Σw², content) + (f_syst · content)²)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::Axis;
use crate::error::{FitError, Result};
use crate::hist::Binning;

/// Weighted running sums for O(1) mean / RMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub sum_w: f64,
    pub sum_wx: f64,
    pub sum_wx2: f64,
}

impl Moments {
    pub fn push(&mut self, x: f64, w: f64) {
        self.sum_w += w;
        self.sum_wx += w * x;
        self.sum_wx2 += w * x * x;
    }

    pub fn mean(&self) -> f64 {
        if self.sum_w == 0.0 {
            return 0.0;
        }
        self.sum_wx / self.sum_w
    }

    /// Population standard deviation.
    pub fn rms(&self) -> f64 {
        if self.sum_w == 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_wx2 / self.sum_w - mean * mean).max(0.0).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    name: String,
    binning: Binning,
    sum_w: Vec<f64>,
    sum_w2: Vec<f64>,
    frac_syst: f64,
    entries: u64,
    dropped: u64,
    moments: Moments,
}

impl Histogram1D {
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Result<Self> {
        Ok(Self::with_binning(Binning::new(n_bins, lo, hi)?))
    }

    pub fn with_binning(binning: Binning) -> Self {
        let n = binning.n_bins();
        Self {
            name: String::new(),
            binning,
            sum_w: vec![0.0; n],
            sum_w2: vec![0.0; n],
            frac_syst: 0.0,
            entries: 0,
            dropped: 0,
            moments: Moments::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn from_projection(
        name: String,
        binning: Binning,
        sum_w: Vec<f64>,
        sum_w2: Vec<f64>,
        entries: u64,
        moments: Moments,
    ) -> Self {
        Self {
            name,
            binning,
            sum_w,
            sum_w2,
            frac_syst: 0.0,
            entries,
            dropped: 0,
            moments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn n_bins(&self) -> usize {
        self.binning.n_bins()
    }

    /// Increment the bin containing `v` by one.
    pub fn fill(&mut self, v: f64) -> Option<usize> {
        self.fill_weighted(v, 1.0)
    }

    /// Increment the bin containing `v` by `w`.
    ///
    /// Values outside `[lo, hi)` and negative or non-finite weights are
    /// dropped (counted, never clipped into an edge bin).
    pub fn fill_weighted(&mut self, v: f64, w: f64) -> Option<usize> {
        let bin = if valid_weight(w) { self.binning.find_bin(v) } else { None };
        let Some(i) = bin else {
            self.dropped += 1;
            return None;
        };
        self.sum_w[i] += w;
        self.sum_w2[i] += w * w;
        self.entries += 1;
        self.moments.push(v, w);
        Some(i)
    }

    pub fn fill_all<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for v in values {
            self.fill(v);
        }
    }

    pub fn bin_content(&self, i: usize) -> Option<f64> {
        self.sum_w.get(i).copied()
    }

    pub fn bin_error(&self, i: usize) -> Option<f64> {
        let content = *self.sum_w.get(i)?;
        let stat2 = *self.sum_w2.get(i)?;
        Some(combined_error(content, stat2, self.frac_syst))
    }

    pub fn contents(&self) -> &[f64] {
        &self.sum_w
    }

    pub fn sum_w2(&self) -> &[f64] {
        &self.sum_w2
    }

    pub fn errors(&self) -> Vec<f64> {
        (0..self.n_bins()).filter_map(|i| self.bin_error(i)).collect()
    }

    pub fn bin_center(&self, i: usize) -> f64 {
        self.binning.center(i)
    }

    pub fn bin_low_edge(&self, i: usize) -> f64 {
        self.binning.low_edge(i)
    }

    pub fn bin_width(&self) -> f64 {
        self.binning.width()
    }

    pub fn edges(&self) -> Vec<f64> {
        self.binning.edges()
    }

    /// Overlay a fractional systematic term on every bin error.
    pub fn set_fractional_systematic(&mut self, frac: f64) -> Result<()> {
        if !(frac.is_finite() && frac >= 0.0) {
            return Err(FitError::invalid(format!(
                "fractional systematic must be finite and >= 0, got {frac}"
            )));
        }
        self.frac_syst = frac;
        Ok(())
    }

    pub fn fractional_systematic(&self) -> f64 {
        self.frac_syst
    }

    /// Number of in-range fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Number of fills dropped for falling outside `[lo, hi)`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sum of all bin contents.
    pub fn integral(&self) -> f64 {
        self.sum_w.iter().sum()
    }

    /// Sum of contents of bins whose centers lie in `[a, b]`.
    pub fn integral_between(&self, a: f64, b: f64) -> f64 {
        (0..self.n_bins())
            .filter(|&i| {
                let c = self.bin_center(i);
                c >= a && c <= b
            })
            .map(|i| self.sum_w[i])
            .sum()
    }

    /// Index of the largest bin (first one on ties).
    pub fn max_bin(&self) -> usize {
        let mut best = 0;
        for (i, &c) in self.sum_w.iter().enumerate() {
            if c > self.sum_w[best] {
                best = i;
            }
        }
        best
    }

    pub fn moments(&self) -> &Moments {
        &self.moments
    }

    pub fn mean(&self, axis: Axis) -> Result<f64> {
        self.require_x(axis)?;
        Ok(self.moments.mean())
    }

    pub fn rms(&self, axis: Axis) -> Result<f64> {
        self.require_x(axis)?;
        Ok(self.moments.rms())
    }

    /// Check the internal invariants of a deserialized histogram.
    pub fn validate(&self) -> Result<()> {
        let n = self.binning.n_bins();
        if self.sum_w.len() != n || self.sum_w2.len() != n {
            return Err(FitError::invalid(format!(
                "histogram '{}' has {} bins but {} contents / {} sumw2",
                self.name,
                n,
                self.sum_w.len(),
                self.sum_w2.len()
            )));
        }
        check_sums(&self.sum_w, &self.sum_w2)?;
        if !(self.frac_syst.is_finite() && self.frac_syst >= 0.0) {
            return Err(FitError::invalid("fractional systematic must be finite and >= 0"));
        }
        Ok(())
    }

    fn require_x(&self, axis: Axis) -> Result<()> {
        match axis {
            Axis::X => Ok(()),
            Axis::Y => Err(FitError::invalid("1D histogram has no Y axis")),
        }
    }
}

pub(crate) fn valid_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

/// `sqrt(max(Σw², content) + (f · content)²)`.
pub(crate) fn combined_error(content: f64, sum_w2: f64, frac_syst: f64) -> f64 {
    let syst = frac_syst * content;
    (sum_w2.max(content) + syst * syst).sqrt()
}

/// Contents and squared-weight sums of a loaded histogram must be finite and >= 0.
pub(crate) fn check_sums(sum_w: &[f64], sum_w2: &[f64]) -> Result<()> {
    if sum_w.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(FitError::invalid("bin contents must be finite and >= 0"));
    }
    if sum_w2.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(FitError::invalid("sum of squared weights must be finite and >= 0"));
    }
    Ok(())
}
