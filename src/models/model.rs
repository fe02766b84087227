//! Model evaluation for Gaussian / exponential / Breit-Wigner sums.
//!
//! The fitter relies on two primitive operations:
//! - evaluate `f(x; θ)` (for residuals/curves)
//! - fill the gradient `∂f/∂θ_k` at `x` (for the Jacobian)
//!
//! Every term is linear in its first parameter (the normalization), which the
//! initial-guess code exploits.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::hist::Histogram1D;

/// FWHM of a unit Gaussian, `2·sqrt(2·ln 2)`.
const GAUSS_FWHM: f64 = 2.354_820_045_030_949;

/// A single additive shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// `norm · exp(-½((x - mean)/sigma)²)`
    Gaussian,
    /// `norm · exp(slope · x)`
    Exponential,
    /// `norm · (Γ/2π) / ((x - mean)² + Γ²/4)`
    BreitWigner,
}

impl Term {
    pub fn arity(self) -> usize {
        self.param_labels().len()
    }

    pub fn label(self) -> &'static str {
        match self {
            Term::Gaussian => "gaus",
            Term::Exponential => "expo",
            Term::BreitWigner => "bw",
        }
    }

    pub fn param_labels(self) -> &'static [&'static str] {
        match self {
            Term::Gaussian => &["norm", "mean", "sigma"],
            Term::Exponential => &["norm", "slope"],
            Term::BreitWigner => &["norm", "mean", "width"],
        }
    }

    pub fn evaluate(self, x: f64, p: &[f64]) -> f64 {
        match self {
            Term::Gaussian => {
                let z = (x - p[1]) / p[2];
                p[0] * (-0.5 * z * z).exp()
            }
            Term::Exponential => p[0] * (p[1] * x).exp(),
            Term::BreitWigner => {
                let d = x - p[1];
                let g = p[2];
                let denom = d * d + 0.25 * g * g;
                p[0] * g / (2.0 * PI) / denom
            }
        }
    }

    /// Partial derivatives with respect to this term's parameters.
    pub fn gradient(self, x: f64, p: &[f64], out: &mut [f64]) {
        match self {
            Term::Gaussian => {
                let (n, mean, sigma) = (p[0], p[1], p[2]);
                let z = (x - mean) / sigma;
                let e = (-0.5 * z * z).exp();
                out[0] = e;
                out[1] = n * e * z / sigma;
                out[2] = n * e * z * z / sigma;
            }
            Term::Exponential => {
                let e = (p[1] * x).exp();
                out[0] = e;
                out[1] = p[0] * x * e;
            }
            Term::BreitWigner => {
                let (n, mean, g) = (p[0], p[1], p[2]);
                let d = x - mean;
                let denom = d * d + 0.25 * g * g;
                out[0] = g / (2.0 * PI) / denom;
                out[1] = n * g / (2.0 * PI) * 2.0 * d / (denom * denom);
                out[2] = n / (2.0 * PI) * (denom - 0.5 * g * g) / (denom * denom);
            }
        }
    }
}

/// A term together with the start of its parameter sub-range in θ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub term: Term,
    pub offset: usize,
}

impl Component {
    fn params<'a>(&self, theta: &'a [f64]) -> Option<&'a [f64]> {
        theta.get(self.offset..self.offset + self.term.arity())
    }
}

/// A named sum of terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    components: Vec<Component>,
    param_names: Vec<String>,
    guess: Option<Vec<f64>>,
}

impl Model {
    pub fn new(name: impl Into<String>, terms: &[Term]) -> Result<Self> {
        if terms.is_empty() {
            return Err(FitError::invalid("model needs at least one term"));
        }
        let mut components = Vec::with_capacity(terms.len());
        let mut param_names = Vec::new();
        let mut offset = 0;
        for (k, &term) in terms.iter().enumerate() {
            // Repeated terms get an occurrence index: gaus0_mean, gaus1_mean, ...
            let repeated = terms.iter().filter(|t| **t == term).count() > 1;
            let prefix = if repeated {
                let occurrence = terms[..k].iter().filter(|t| **t == term).count();
                format!("{}{occurrence}", term.label())
            } else {
                term.label().to_string()
            };
            for label in term.param_labels() {
                param_names.push(format!("{prefix}_{label}"));
            }
            components.push(Component { term, offset });
            offset += term.arity();
        }
        Ok(Self {
            name: name.into(),
            components,
            param_names,
            guess: None,
        })
    }

    pub fn gaussian() -> Self {
        Self::single("gaus", Term::Gaussian)
    }

    pub fn breit_wigner() -> Self {
        Self::single("bw", Term::BreitWigner)
    }

    pub fn exponential() -> Self {
        Self::single("expo", Term::Exponential)
    }

    /// Exponential background plus Gaussian peak (background parameters first).
    pub fn exponential_plus_gaussian() -> Self {
        Self {
            name: "expo+gaus".to_string(),
            components: vec![
                Component { term: Term::Exponential, offset: 0 },
                Component { term: Term::Gaussian, offset: 2 },
            ],
            param_names: ["expo_norm", "expo_slope", "gaus_norm", "gaus_mean", "gaus_sigma"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            guess: None,
        }
    }

    fn single(name: &str, term: Term) -> Self {
        Self {
            name: name.to_string(),
            components: vec![Component { term, offset: 0 }],
            param_names: term
                .param_labels()
                .iter()
                .map(|l| format!("{}_{l}", term.label()))
                .collect(),
            guess: None,
        }
    }

    /// Rename parameters (e.g. `BkgNorm`, `SigMean`); length must match the arity.
    pub fn with_param_names<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        if names.len() != self.arity() {
            return Err(FitError::invalid(format!(
                "model '{}' has {} parameters, got {} names",
                self.name,
                self.arity(),
                names.len()
            )));
        }
        self.param_names = names.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(self)
    }

    /// Attach a caller-supplied initial guess.
    pub fn with_guess(mut self, guess: Vec<f64>) -> Result<Self> {
        self.check_params(&guess)?;
        self.guess = Some(guess);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn arity(&self) -> usize {
        self.components.iter().map(|c| c.term.arity()).sum()
    }

    /// The caller-supplied guess, if any.
    pub fn guess(&self) -> Option<&[f64]> {
        self.guess.as_deref()
    }

    /// Caller-supplied guess, else a fixed built-in seed.
    pub fn default_guess(&self) -> Vec<f64> {
        if let Some(g) = &self.guess {
            return g.clone();
        }
        let mut out = Vec::with_capacity(self.arity());
        for c in &self.components {
            match c.term {
                Term::Gaussian | Term::BreitWigner => out.extend_from_slice(&[1.0, 0.0, 1.0]),
                Term::Exponential => out.extend_from_slice(&[1.0, -1.0]),
            }
        }
        out
    }

    /// Seed parameters from histogram shape statistics.
    ///
    /// Peaks are placed at the highest bin with a width taken from the half-maximum
    /// span; an exponential slope comes from the first and last non-empty bins.
    pub fn guess_from_histogram(&self, hist: &Histogram1D) -> Vec<f64> {
        let imax = hist.max_bin();
        let peak = hist.bin_content(imax).unwrap_or(0.0).max(1.0);
        let peak_x = hist.bin_center(imax);
        let fwhm = half_max_span(hist).max(hist.bin_width());
        let (expo_norm, expo_slope) = exponential_seed(hist);

        let mut out = Vec::with_capacity(self.arity());
        for c in &self.components {
            match c.term {
                Term::Gaussian => out.extend_from_slice(&[peak, peak_x, fwhm / GAUSS_FWHM]),
                // Peak height of a BW is 2·norm/(πΓ).
                Term::BreitWigner => out.extend_from_slice(&[peak * PI * fwhm / 2.0, peak_x, fwhm]),
                Term::Exponential => out.extend_from_slice(&[expo_norm, expo_slope]),
            }
        }
        out
    }

    /// Reject parameter vectors of the wrong length or with non-finite entries.
    pub fn check_params(&self, theta: &[f64]) -> Result<()> {
        if theta.len() != self.arity() {
            return Err(FitError::invalid(format!(
                "model '{}' expects {} parameters, got {}",
                self.name,
                self.arity(),
                theta.len()
            )));
        }
        if let Some(k) = theta.iter().position(|v| !v.is_finite()) {
            return Err(FitError::invalid(format!(
                "parameter '{}' is not finite",
                self.param_names[k]
            )));
        }
        Ok(())
    }

    /// `f(x; θ)`. Returns NaN when `θ` is shorter than the arity.
    pub fn evaluate(&self, x: f64, theta: &[f64]) -> f64 {
        let mut y = 0.0;
        for c in &self.components {
            let Some(p) = c.params(theta) else {
                return f64::NAN;
            };
            y += c.term.evaluate(x, p);
        }
        y
    }

    /// Fill `out[k] = ∂f/∂θ_k` at `x`. `out` must have length `arity()`.
    pub fn gradient(&self, x: f64, theta: &[f64], out: &mut [f64]) {
        for c in &self.components {
            let range = c.offset..c.offset + c.term.arity();
            if let (Some(p), Some(o)) = (theta.get(range.clone()), out.get_mut(range)) {
                c.term.gradient(x, p, o);
            }
        }
    }

    /// Per-parameter sign factors that make every width positive without
    /// changing `f`.
    ///
    /// A Gaussian is even in `sigma`; a Breit-Wigner is odd in `width` so the
    /// norm flips with it.
    pub fn canonical_signs(&self, theta: &[f64]) -> Vec<f64> {
        let mut signs = vec![1.0; self.arity()];
        for c in &self.components {
            let o = c.offset;
            match c.term {
                Term::Gaussian if theta.get(o + 2).is_some_and(|s| *s < 0.0) => signs[o + 2] = -1.0,
                Term::BreitWigner if theta.get(o + 2).is_some_and(|g| *g < 0.0) => {
                    signs[o] = -1.0;
                    signs[o + 2] = -1.0;
                }
                _ => {}
            }
        }
        signs
    }

    /// Parameter index of each term's normalization.
    pub fn norm_indices(&self) -> Vec<usize> {
        self.components.iter().map(|c| c.offset).collect()
    }

    /// Value of each term separately (for drawing signal / background).
    pub fn evaluate_terms(&self, x: f64, theta: &[f64]) -> Vec<f64> {
        self.components
            .iter()
            .map(|c| c.params(theta).map_or(f64::NAN, |p| c.term.evaluate(x, p)))
            .collect()
    }
}

/// Width of the contiguous run of bins at or above half the peak content.
fn half_max_span(hist: &Histogram1D) -> f64 {
    let contents = hist.contents();
    let imax = hist.max_bin();
    let half = contents[imax] / 2.0;
    if half <= 0.0 {
        return hist.binning().hi() - hist.binning().lo();
    }
    let mut first = imax;
    while first > 0 && contents[first - 1] >= half {
        first -= 1;
    }
    let mut last = imax;
    while last + 1 < contents.len() && contents[last + 1] >= half {
        last += 1;
    }
    (last - first + 1) as f64 * hist.bin_width()
}

fn exponential_seed(hist: &Histogram1D) -> (f64, f64) {
    let contents = hist.contents();
    let first = contents.iter().position(|c| *c > 0.0);
    let last = contents.iter().rposition(|c| *c > 0.0);
    match (first, last) {
        (Some(a), Some(b)) if b > a => {
            let (x1, x2) = (hist.bin_center(a), hist.bin_center(b));
            let slope = (contents[b] / contents[a]).ln() / (x2 - x1);
            let norm = contents[a] * (-slope * x1).exp();
            if slope.is_finite() && norm.is_finite() {
                (norm, slope)
            } else {
                (1.0, -1.0)
            }
        }
        _ => (1.0, -1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn numeric_gradient(model: &Model, x: f64, theta: &[f64]) -> Vec<f64> {
        (0..theta.len())
            .map(|k| {
                let h = 1e-6 * theta[k].abs().max(1.0);
                let mut up = theta.to_vec();
                let mut dn = theta.to_vec();
                up[k] += h;
                dn[k] -= h;
                (model.evaluate(x, &up) - model.evaluate(x, &dn)) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn gaussian_peak_value() {
        let m = Model::gaussian();
        assert_relative_eq!(m.evaluate(0.5, &[100.0, 0.5, 0.2]), 100.0);
        assert_relative_eq!(m.evaluate(0.7, &[100.0, 0.5, 0.2]), 100.0 * (-0.5_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn breit_wigner_is_normalized_to_norm() {
        // Integral of the BW density is `norm`.
        let m = Model::breit_wigner();
        let theta = [50.0, 0.77, 0.15];
        let (lo, hi, n) = (-200.0, 200.0, 400_000);
        let dx = (hi - lo) / n as f64;
        let integral: f64 = (0..n).map(|i| m.evaluate(lo + (i as f64 + 0.5) * dx, &theta) * dx).sum();
        assert_relative_eq!(integral, 50.0, epsilon = 0.05);
        // Peak height 2·norm/(πΓ)
        assert_relative_eq!(m.evaluate(0.77, &theta), 2.0 * 50.0 / (PI * 0.15), epsilon = 1e-9);
    }

    #[test]
    fn canonical_signs_keep_the_curve() {
        let m = Model::exponential_plus_gaussian();
        let theta = [100.0, -1.0, 200.0, 3.1, -0.05];
        let s = m.canonical_signs(&theta);
        assert_eq!(s, vec![1.0, 1.0, 1.0, 1.0, -1.0]);

        let bw = Model::breit_wigner();
        let theta = [-50.0, 0.77, -0.15];
        let s = bw.canonical_signs(&theta);
        let flipped: Vec<f64> = theta.iter().zip(&s).map(|(t, k)| t * k).collect();
        assert_eq!(flipped, vec![50.0, 0.77, 0.15]);
        assert_relative_eq!(bw.evaluate(0.8, &theta), bw.evaluate(0.8, &flipped), epsilon = 1e-12);
    }

    #[test]
    fn composite_is_sum_of_terms() {
        let m = Model::exponential_plus_gaussian();
        let theta = [100.0, -1.0, 200.0, 3.1, 0.05];
        let x: f64 = 3.0;
        let expected = 100.0 * (-x).exp() + 200.0 * (-0.5 * ((x - 3.1) / 0.05_f64).powi(2)).exp();
        assert_relative_eq!(m.evaluate(x, &theta), expected, epsilon = 1e-12);
        let parts = m.evaluate_terms(x, &theta);
        assert_relative_eq!(parts[0] + parts[1], expected, epsilon = 1e-12);
        assert_eq!(m.norm_indices(), vec![0, 2]);
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let cases = [
            (Model::gaussian(), vec![120.0, 0.5, 0.2]),
            (Model::exponential(), vec![80.0, -1.3]),
            (Model::breit_wigner(), vec![50.0, 0.77, 0.15]),
            (Model::exponential_plus_gaussian(), vec![100.0, -1.0, 200.0, 3.1, 0.05]),
        ];
        for (model, theta) in cases {
            for &x in &[0.3, 0.6, 0.8, 3.05, 3.2] {
                let mut analytic = vec![0.0; model.arity()];
                model.gradient(x, &theta, &mut analytic);
                let numeric = numeric_gradient(&model, x, &theta);
                for (a, n) in analytic.iter().zip(&numeric) {
                    assert_relative_eq!(*a, *n, epsilon = 1e-5, max_relative = 1e-5);
                }
            }
        }
    }

    #[test]
    fn arity_and_names_follow_terms() {
        let m = Model::new("double", &[Term::Gaussian, Term::Gaussian, Term::Exponential]).unwrap();
        assert_eq!(m.arity(), 8);
        assert_eq!(m.param_names()[0], "gaus0_norm");
        assert_eq!(m.param_names()[3], "gaus1_norm");
        assert_eq!(m.param_names()[6], "expo_norm");
        assert_eq!(m.components()[2].offset, 6);
        assert!(Model::new("empty", &[]).is_err());
    }

    #[test]
    fn renaming_and_guess_validate_length() {
        let m = Model::exponential_plus_gaussian()
            .with_param_names(&["BkgNorm", "BkgSlope", "SigNorm", "SigMean", "SigSigma"])
            .unwrap();
        assert_eq!(m.param_names()[3], "SigMean");
        assert!(Model::gaussian().with_param_names(&["a"]).is_err());

        assert!(Model::gaussian().with_guess(vec![1.0, 2.0]).is_err());
        assert!(Model::gaussian().with_guess(vec![1.0, f64::NAN, 1.0]).is_err());
        let g = Model::gaussian().with_guess(vec![40.0, 5.0, 1.0]).unwrap();
        assert_eq!(g.default_guess(), vec![40.0, 5.0, 1.0]);
        assert_eq!(Model::gaussian().default_guess().len(), 3);
    }

    #[test]
    fn short_parameter_vector_evaluates_to_nan() {
        assert!(Model::gaussian().evaluate(0.0, &[1.0, 0.0]).is_nan());
        assert!(Model::gaussian().check_params(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn histogram_guess_locates_peak() {
        let mut h = Histogram1D::new(100, 0.0, 2.0).unwrap();
        let m = Model::gaussian();
        let theta = [1000.0, 0.8, 0.1];
        for i in 0..100 {
            let x = h.bin_center(i);
            h.fill_weighted(x, m.evaluate(x, &theta).round());
        }
        let g = m.guess_from_histogram(&h);
        assert!((g[1] - 0.8).abs() <= 0.02);
        assert!((g[2] - 0.1).abs() < 0.03, "sigma guess {}", g[2]);
        assert!(g[0] > 900.0);
    }

    #[test]
    fn exponential_guess_recovers_slope_of_clean_curve() {
        let mut h = Histogram1D::new(20, 0.0, 2.0).unwrap();
        for i in 0..20 {
            let x = h.bin_center(i);
            h.fill_weighted(x, 500.0 * (-1.5 * x).exp());
        }
        let g = Model::exponential().guess_from_histogram(&h);
        assert_relative_eq!(g[1], -1.5, epsilon = 1e-9);
        assert_relative_eq!(g[0], 500.0, epsilon = 1e-6);
    }
}
