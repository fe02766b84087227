//! Two-dimensional weighted histogram with axis projections.

use serde::{Deserialize, Serialize};

use crate::domain::Axis;
use crate::error::{FitError, Result};
use crate::hist::hist1d::{check_sums, combined_error, valid_weight};
use crate::hist::{Binning, Histogram1D, Moments};

/// Cells are stored row-major: `ix * ny + iy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    name: String,
    x: Binning,
    y: Binning,
    sum_w: Vec<f64>,
    sum_w2: Vec<f64>,
    frac_syst: f64,
    entries: u64,
    dropped: u64,
    moments_x: Moments,
    moments_y: Moments,
    sum_wxy: f64,
}

impl Histogram2D {
    pub fn new(nx: usize, x_lo: f64, x_hi: f64, ny: usize, y_lo: f64, y_hi: f64) -> Result<Self> {
        let x = Binning::new(nx, x_lo, x_hi)?;
        let y = Binning::new(ny, y_lo, y_hi)?;
        let cells = nx
            .checked_mul(ny)
            .ok_or_else(|| FitError::invalid("2D histogram has too many cells"))?;
        Ok(Self {
            name: String::new(),
            x,
            y,
            sum_w: vec![0.0; cells],
            sum_w2: vec![0.0; cells],
            frac_syst: 0.0,
            entries: 0,
            dropped: 0,
            moments_x: Moments::default(),
            moments_y: Moments::default(),
            sum_wxy: 0.0,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binning(&self, axis: Axis) -> &Binning {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.fill_weighted(x, y, 1.0)
    }

    /// Values outside `[lo, hi)` on either axis, and negative or non-finite
    /// weights, are dropped.
    pub fn fill_weighted(&mut self, x: f64, y: f64, w: f64) -> Option<(usize, usize)> {
        let cell = if valid_weight(w) {
            self.x.find_bin(x).zip(self.y.find_bin(y))
        } else {
            None
        };
        let Some((ix, iy)) = cell else {
            self.dropped += 1;
            return None;
        };
        let k = self.cell(ix, iy);
        self.sum_w[k] += w;
        self.sum_w2[k] += w * w;
        self.entries += 1;
        self.moments_x.push(x, w);
        self.moments_y.push(y, w);
        self.sum_wxy += w * x * y;
        Some((ix, iy))
    }

    pub fn bin_content(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.x.n_bins() || iy >= self.y.n_bins() {
            return None;
        }
        self.sum_w.get(self.cell(ix, iy)).copied()
    }

    pub fn bin_error(&self, ix: usize, iy: usize) -> Option<f64> {
        let content = self.bin_content(ix, iy)?;
        let stat2 = self.sum_w2[self.cell(ix, iy)];
        Some(combined_error(content, stat2, self.frac_syst))
    }

    pub fn set_fractional_systematic(&mut self, frac: f64) -> Result<()> {
        if !(frac.is_finite() && frac >= 0.0) {
            return Err(FitError::invalid(format!(
                "fractional systematic must be finite and >= 0, got {frac}"
            )));
        }
        self.frac_syst = frac;
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn integral(&self) -> f64 {
        self.sum_w.iter().sum()
    }

    pub fn mean(&self, axis: Axis) -> f64 {
        self.moments(axis).mean()
    }

    pub fn rms(&self, axis: Axis) -> f64 {
        self.moments(axis).rms()
    }

    /// Pearson correlation of the filled `(x, y)` values.
    pub fn correlation(&self) -> f64 {
        let w = self.moments_x.sum_w;
        if w == 0.0 {
            return 0.0;
        }
        let cov = self.sum_wxy / w - self.moments_x.mean() * self.moments_y.mean();
        let denom = self.moments_x.rms() * self.moments_y.rms();
        if denom == 0.0 {
            return 0.0;
        }
        cov / denom
    }

    /// Sum over Y; keeps the X bin edges.
    pub fn projection_x(&self) -> Histogram1D {
        self.project(Axis::X)
    }

    /// Sum over X; keeps the Y bin edges.
    pub fn projection_y(&self) -> Histogram1D {
        self.project(Axis::Y)
    }

    /// Check the internal invariants of a deserialized histogram.
    pub fn validate(&self) -> Result<()> {
        let cells = self.x.n_bins() * self.y.n_bins();
        if self.sum_w.len() != cells || self.sum_w2.len() != cells {
            return Err(FitError::invalid(format!(
                "2D histogram '{}' expects {cells} cells, found {} contents / {} sumw2",
                self.name,
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

    fn project(&self, keep: Axis) -> Histogram1D {
        let (nx, ny) = (self.x.n_bins(), self.y.n_bins());
        let (binning, n, suffix) = match keep {
            Axis::X => (self.x.clone(), nx, "px"),
            Axis::Y => (self.y.clone(), ny, "py"),
        };
        let mut sum_w = vec![0.0; n];
        let mut sum_w2 = vec![0.0; n];
        for ix in 0..nx {
            for iy in 0..ny {
                let k = self.cell(ix, iy);
                let i = match keep {
                    Axis::X => ix,
                    Axis::Y => iy,
                };
                sum_w[i] += self.sum_w[k];
                sum_w2[i] += self.sum_w2[k];
            }
        }
        let name = if self.name.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{suffix}", self.name)
        };
        Histogram1D::from_projection(
            name,
            binning,
            sum_w,
            sum_w2,
            self.entries,
            self.moments(keep).clone(),
        )
    }

    fn moments(&self, axis: Axis) -> &Moments {
        match axis {
            Axis::X => &self.moments_x,
            Axis::Y => &self.moments_y,
        }
    }

    fn cell(&self, ix: usize, iy: usize) -> usize {
        ix * self.y.n_bins() + iy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Distribution, Sampler};
    use approx::assert_relative_eq;

    #[test]
    fn weights_follow_the_1d_rules() {
        let mut h = Histogram2D::new(2, 0.0, 1.0, 2, 0.0, 1.0).unwrap();
        assert_eq!(h.fill_weighted(0.2, 0.2, -1.0), None);
        assert_eq!(h.dropped(), 1);
        h.fill_weighted(0.2, 0.2, 0.36);
        let c = h.bin_content(0, 0).unwrap();
        assert!(h.bin_error(0, 0).unwrap() >= c.sqrt());
    }

    #[test]
    fn loaded_negative_sum_w2_fails_validation() {
        let h = Histogram2D::new(1, 0.0, 1.0, 2, 0.0, 1.0).unwrap();
        let mut json = serde_json::to_value(&h).unwrap();
        json["sum_w2"] = serde_json::json!([0.0, -4.0]);
        let bad: Histogram2D = serde_json::from_value(json).unwrap();
        assert!(matches!(bad.validate(), Err(FitError::InvalidParameter(_))));
    }

    #[test]
    fn drops_when_either_axis_is_out_of_range() {
        let mut h = Histogram2D::new(4, 0.0, 4.0, 2, 0.0, 2.0).unwrap();
        assert_eq!(h.fill(1.5, 0.5), Some((1, 0)));
        assert_eq!(h.fill(5.0, 0.5), None);
        assert_eq!(h.fill(1.5, 2.0), None);
        assert_eq!(h.entries(), 1);
        assert_eq!(h.dropped(), 2);
        assert_eq!(h.bin_content(1, 0), Some(1.0));
        assert_eq!(h.bin_content(4, 0), None);
    }

    #[test]
    fn projection_x_matches_direct_accumulation() {
        let mut sampler = Sampler::new(10);
        let gaus = Distribution::Gaussian { mean: 0.0, sigma: 1.0 };
        let mut h2 = Histogram2D::new(60, -3.0, 3.0, 40, -3.0, 3.0).unwrap();
        let mut direct = Histogram1D::new(60, -3.0, 3.0).unwrap();
        for _ in 0..20_000 {
            let (x, y) = sampler.draw_pair(gaus, gaus).unwrap();
            if h2.fill(x, y).is_some() {
                direct.fill(x);
            }
        }
        let px = h2.projection_x();
        assert_eq!(px.integral(), h2.entries() as f64);
        assert_eq!(px.contents(), direct.contents());
        assert_eq!(px.edges(), direct.edges());
        assert_relative_eq!(px.mean(Axis::X).unwrap(), direct.mean(Axis::X).unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn projection_y_keeps_y_edges() {
        let mut h = Histogram2D::new(3, 0.0, 3.0, 2, -1.0, 1.0).unwrap().named("h2");
        h.fill(0.5, -0.5);
        h.fill(1.5, -0.5);
        h.fill(2.5, 0.5);
        let py = h.projection_y();
        assert_eq!(py.name(), "h2_py");
        assert_eq!(py.edges(), vec![-1.0, 0.0, 1.0]);
        assert_eq!(py.contents(), &[2.0, 1.0]);
        assert_eq!(py.bin_error(0), Some(2.0_f64.sqrt()));
    }

    #[test]
    fn independent_axes_have_small_correlation() {
        let mut sampler = Sampler::new(4);
        let gaus = Distribution::Gaussian { mean: 0.0, sigma: 1.0 };
        let mut h = Histogram2D::new(50, -5.0, 5.0, 50, -5.0, 5.0).unwrap();
        for _ in 0..50_000 {
            let (x, y) = sampler.draw_pair(gaus, gaus).unwrap();
            h.fill(x, y);
        }
        assert!(h.correlation().abs() < 0.02);
        assert!((h.mean(Axis::X)).abs() < 0.02);
        assert!((h.rms(Axis::Y) - 1.0).abs() < 0.02);
    }

    #[test]
    fn perfectly_correlated_fills() {
        let mut h = Histogram2D::new(10, 0.0, 10.0, 10, 0.0, 10.0).unwrap();
        for i in 0..10 {
            let v = i as f64 + 0.5;
            h.fill(v, v);
        }
        assert_relative_eq!(h.correlation(), 1.0, epsilon = 1e-9);
    }
}
