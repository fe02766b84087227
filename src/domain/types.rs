//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::Mixture;
use crate::error::{FitError, Result};
use crate::fit::FitOptions;
use crate::models::Model;

/// Histogram axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

/// Closed interval of bin centers used by a fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRange {
    pub lo: f64,
    pub hi: f64,
}

impl FitRange {
    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(FitError::invalid(format!(
                "fit range requires finite lo < hi, got [{lo}, {hi}]"
            )));
        }
        Ok(Self { lo, hi })
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }
}

/// Which model(s) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSpec {
    /// Gaussian and Breit-Wigner, keep the better chi2/ndf.
    Auto,
    Gaus,
    Bw,
    Expo,
    /// Exponential background plus Gaussian peak.
    ExpoGaus,
    /// Every single-component and composite model.
    All,
}

impl ModelSpec {
    /// Candidate models, simplest first.
    pub fn models(self) -> Vec<Model> {
        match self {
            ModelSpec::Auto => vec![Model::gaussian(), Model::breit_wigner()],
            ModelSpec::Gaus => vec![Model::gaussian()],
            ModelSpec::Bw => vec![Model::breit_wigner()],
            ModelSpec::Expo => vec![Model::exponential()],
            ModelSpec::ExpoGaus => vec![Model::exponential_plus_gaussian()],
            ModelSpec::All => vec![
                Model::gaussian(),
                Model::breit_wigner(),
                Model::exponential(),
                Model::exponential_plus_gaussian(),
            ],
        }
    }
}

/// One fitted parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

/// Output of a single fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: Model,
    pub params: Vec<ParamEstimate>,
    /// Row-major `p x p` parameter covariance.
    pub covariance: Vec<f64>,
    pub chi2: f64,
    pub ndf: usize,
    /// Upper-tail chi-square probability for `(chi2, ndf)`.
    pub probability: f64,
    pub bins_used: usize,
    pub iterations: usize,
    pub range: FitRange,
}

impl FitResult {
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.error).collect()
    }

    pub fn param(&self, name: &str) -> Option<&ParamEstimate> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn chi2_per_ndf(&self) -> f64 {
        if self.ndf == 0 {
            return f64::NAN;
        }
        self.chi2 / self.ndf as f64
    }

    /// Covariance entry `(i, j)`.
    pub fn covariance_at(&self, i: usize, j: usize) -> Option<f64> {
        let p = self.params.len();
        if i >= p || j >= p {
            return None;
        }
        self.covariance.get(i * p + j).copied()
    }

    /// Fitted model value at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.model.evaluate(x, &self.values())
    }

    /// Sample the fitted curve on `n` evenly spaced points over the fit range.
    pub fn curve(&self, n: usize) -> CurveGrid {
        let n = n.max(2);
        let theta = self.values();
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let u = i as f64 / (n as f64 - 1.0);
            let xi = self.range.lo + u * (self.range.hi - self.range.lo);
            x.push(xi);
            y.push(self.model.evaluate(xi, &theta));
        }
        CurveGrid { x, y }
    }
}

/// A fitted curve sampled on a grid (for an external plotting collaborator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Configuration for the `fit` command as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Column to histogram for multi-column inputs (0-based).
    pub column: Option<usize>,
    pub n_bins: usize,
    pub lo: f64,
    pub hi: f64,
    pub range: Option<FitRange>,
    pub model_spec: ModelSpec,
    /// Fit every column of a multi-column file (in parallel) instead of one.
    pub all_columns: bool,
    /// Explicit initial guess (single-model selections only).
    pub guess: Option<Vec<f64>>,
    /// Parameter names overriding the model's defaults (single-model selections only).
    pub param_names: Option<Vec<String>>,
    /// Fractional systematic added in quadrature to each bin error.
    pub frac_syst: f64,
    pub options: FitOptions,
    pub export: Option<PathBuf>,
}

/// Configuration for the `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub output: PathBuf,
    pub events: usize,
    pub seed: u64,
    pub mixture: Mixture,
    /// Values per record; each column is drawn independently from the mixture.
    pub columns: usize,
}

/// Configuration for the `hist2d` command.
#[derive(Debug, Clone)]
pub struct Hist2dConfig {
    pub input: PathBuf,
    pub n_bins_x: usize,
    pub x_lo: f64,
    pub x_hi: f64,
    pub n_bins_y: usize,
    pub y_lo: f64,
    pub y_hi: f64,
    pub export: Option<PathBuf>,
}
