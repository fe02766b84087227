//! Low-level fitting routine for a single model.
//!
//! Given:
//! - bin centers `x_i`, contents `c_i` and errors `e_i` inside the fit range
//! - a model `f(x; θ)` and a starting point `θ₀`
//!
//! we minimize
//!
//! ```text
//! χ²(θ) = Σ_i ((c_i - f(x_i; θ)) / e_i)²
//! ```
//!
//! with Levenberg–Marquardt: solve `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr`, accept the
//! step if χ² drops (λ /= 10), otherwise reject it (λ *= 10). Parameter errors
//! are `sqrt(diag((JᵀJ)⁻¹))` at the optimum.
//!
//! Bins with zero error (empty bins without a systematic term) are excluded
//! from the sum rather than divided by.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::{debug, info};

use crate::domain::{FitRange, FitResult, ParamEstimate};
use crate::error::{FitError, Result};
use crate::hist::Histogram1D;
use crate::math::{invert_spd, solve_damped};
use crate::models::Model;

const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Options for the iterative minimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Upper bound on LM iterations (accepted and rejected steps both count).
    pub max_iterations: usize,
    /// Converged once an accepted step lowers χ² by less than
    /// `tolerance · max(χ², 1)`.
    pub tolerance: f64,
    /// Starting damping factor.
    pub lambda_init: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            lambda_init: 1e-3,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(FitError::invalid("max_iterations must be >= 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(FitError::invalid(format!("tolerance must be > 0, got {}", self.tolerance)));
        }
        if !(self.lambda_init.is_finite() && self.lambda_init > 0.0) {
            return Err(FitError::invalid(format!(
                "lambda_init must be > 0, got {}",
                self.lambda_init
            )));
        }
        Ok(())
    }
}

/// Bins that enter the χ² sum.
#[derive(Debug, Clone, Default)]
pub(crate) struct BinData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub e: Vec<f64>,
}

impl BinData {
    pub fn len(&self) -> usize {
        self.x.len()
    }
}

/// Bins whose center lies in `range` and whose error is positive.
pub(crate) fn collect_bins(hist: &Histogram1D, range: FitRange) -> BinData {
    let mut data = BinData::default();
    for i in 0..hist.n_bins() {
        let x = hist.bin_center(i);
        if !range.contains(x) {
            continue;
        }
        let (Some(y), Some(e)) = (hist.bin_content(i), hist.bin_error(i)) else {
            continue;
        };
        if e > 0.0 && e.is_finite() && y.is_finite() {
            data.x.push(x);
            data.y.push(y);
            data.e.push(e);
        }
    }
    data
}

/// The explicit range, or the full histogram axis.
pub fn resolve_range(hist: &Histogram1D, range: Option<FitRange>) -> Result<FitRange> {
    match range {
        Some(r) => FitRange::new(r.lo, r.hi),
        None => FitRange::new(hist.binning().lo(), hist.binning().hi()),
    }
}

/// Fit `model` to `hist` starting from `initial_guess`.
///
/// # Errors
/// - `InvalidParameter`: guess length/finiteness, bad options or range
/// - `InsufficientData`: used bins minus parameters is not positive
/// - `SingularJacobian`: the model or one parameter has no effect on χ²
/// - `Convergence`: `max_iterations` exhausted before the tolerance was met
pub fn fit(
    hist: &Histogram1D,
    model: &Model,
    initial_guess: &[f64],
    range: Option<FitRange>,
    options: &FitOptions,
) -> Result<FitResult> {
    options.validate()?;
    model.check_params(initial_guess)?;
    let range = resolve_range(hist, range)?;

    let data = collect_bins(hist, range);
    let n = data.len();
    let p = model.arity();
    if n <= p {
        return Err(FitError::InsufficientData { bins: n, params: p });
    }

    let mut theta = initial_guess.to_vec();
    let mut chi2_cur = chi2(model, &data, &theta);
    if !chi2_cur.is_finite() {
        return Err(FitError::invalid(format!(
            "initial guess gives a non-finite chi2 for model '{}'",
            model.name()
        )));
    }
    if data.x.iter().all(|&x| model.evaluate(x, &theta) == 0.0) {
        return Err(FitError::SingularJacobian(format!(
            "model '{}' is identically zero over [{}, {}] at the initial guess",
            model.name(),
            range.lo,
            range.hi
        )));
    }

    let (mut a, mut g) = normal_equations(model, &data, &theta);
    if let Some(k) = (0..p).find(|&k| !(a[(k, k)] > 0.0 && a[(k, k)].is_finite())) {
        return Err(FitError::SingularJacobian(format!(
            "parameter '{}' has no effect on chi2 at the initial guess",
            model.param_names()[k]
        )));
    }

    let mut lambda = options.lambda_init;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let Some(delta) = solve_damped(&a, &g, lambda) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(FitError::SingularJacobian(
                    "normal matrix stays singular under damping".to_string(),
                ));
            }
            continue;
        };

        let trial: Vec<f64> = theta.iter().zip(delta.iter()).map(|(t, d)| t + d).collect();
        let chi2_trial = chi2(model, &data, &trial);

        if chi2_trial.is_finite() && chi2_trial <= chi2_cur {
            let reduction = chi2_cur - chi2_trial;
            theta = trial;
            chi2_cur = chi2_trial;
            lambda = (lambda * 0.1).max(LAMBDA_MIN);
            (a, g) = normal_equations(model, &data, &theta);
            debug!(iteration = iterations, chi2 = chi2_cur, lambda, "accepted LM step");

            if reduction <= options.tolerance * chi2_cur.max(1.0) {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            // No downhill step even with gradient-descent sized moves: at the minimum.
            if lambda > LAMBDA_MAX {
                converged = true;
                break;
            }
        }
    }

    if !converged {
        return Err(FitError::Convergence {
            iterations,
            chi2: chi2_cur,
        });
    }

    let mut cov = invert_spd(&a).ok_or_else(|| {
        FitError::SingularJacobian(format!(
            "JᵀJ is not invertible at the solution of model '{}'",
            model.name()
        ))
    })?;

    // Report widths as positive; the covariance follows the sign change.
    let signs = model.canonical_signs(&theta);
    for i in 0..p {
        theta[i] *= signs[i];
        for j in 0..p {
            cov[(i, j)] *= signs[i] * signs[j];
        }
    }

    let mut params = Vec::with_capacity(p);
    for (k, name) in model.param_names().iter().enumerate() {
        let var = cov[(k, k)];
        if !(var.is_finite() && var >= 0.0) {
            return Err(FitError::SingularJacobian(format!(
                "negative variance for parameter '{name}'"
            )));
        }
        params.push(ParamEstimate {
            name: name.clone(),
            value: theta[k],
            error: var.sqrt(),
        });
    }
    let mut covariance = Vec::with_capacity(p * p);
    for i in 0..p {
        for j in 0..p {
            covariance.push(cov[(i, j)]);
        }
    }

    let ndf = n - p;
    let probability = chi2_probability(chi2_cur, ndf);
    info!(
        model = model.name(),
        chi2 = chi2_cur,
        ndf,
        iterations,
        "fit converged"
    );

    Ok(FitResult {
        model: model.clone(),
        params,
        covariance,
        chi2: chi2_cur,
        ndf,
        probability,
        bins_used: n,
        iterations,
        range,
    })
}

/// Upper-tail probability of a χ² value with `ndf` degrees of freedom.
///
/// Returns NaN for `ndf == 0`.
pub fn chi2_probability(chi2: f64, ndf: usize) -> f64 {
    if ndf == 0 || !chi2.is_finite() {
        return f64::NAN;
    }
    match ChiSquared::new(ndf as f64) {
        Ok(dist) => dist.sf(chi2.max(0.0)),
        Err(_) => f64::NAN,
    }
}

pub(crate) fn chi2(model: &Model, data: &BinData, theta: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..data.len() {
        let r = (data.y[i] - model.evaluate(data.x[i], theta)) / data.e[i];
        sum += r * r;
    }
    sum
}

/// `(JᵀJ, Jᵀr)` for weighted residuals `r_i = (c_i - f_i) / e_i`.
fn normal_equations(model: &Model, data: &BinData, theta: &[f64]) -> (DMatrix<f64>, DVector<f64>) {
    let p = model.arity();
    let mut a = DMatrix::<f64>::zeros(p, p);
    let mut g = DVector::<f64>::zeros(p);
    let mut grad = vec![0.0; p];

    for i in 0..data.len() {
        model.gradient(data.x[i], theta, &mut grad);
        let w = 1.0 / (data.e[i] * data.e[i]);
        let r = data.y[i] - model.evaluate(data.x[i], theta);
        for j in 0..p {
            g[j] += w * grad[j] * r;
            for k in 0..=j {
                a[(j, k)] += w * grad[j] * grad[k];
            }
        }
    }
    for j in 0..p {
        for k in 0..j {
            a[(k, j)] = a[(j, k)];
        }
    }
    (a, g)
}
