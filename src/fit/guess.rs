//! Initial-guess seeding.
//!
//! Shape parameters (means, widths, slopes) come from histogram statistics.
//! Every term is linear in its normalization, so with the shapes fixed the
//! normalizations are the solution of a weighted linear least-squares problem:
//!
//! ```text
//! minimize Σ_i ((c_i - Σ_k n_k g_k(x_i)) / e_i)²
//! ```
//!
//! which gives the nonlinear fit a starting point close to the data scale.

use nalgebra::{DMatrix, DVector};

use crate::domain::FitRange;
use crate::fit::fitter::{collect_bins, resolve_range};
use crate::hist::Histogram1D;
use crate::math::solve_least_squares;
use crate::models::Model;

/// Starting parameters for fitting `model` to `hist`.
///
/// A caller-supplied guess on the model always wins.
pub fn initial_guess(hist: &Histogram1D, model: &Model, range: Option<FitRange>) -> Vec<f64> {
    if let Some(g) = model.guess() {
        return g.to_vec();
    }
    let mut theta = model.guess_from_histogram(hist);
    if let Some(norms) = solve_norms(hist, model, &theta, range) {
        for (idx, n) in model.norm_indices().into_iter().zip(norms) {
            theta[idx] = n;
        }
    }
    theta
}

/// Linear least-squares normalizations for fixed shape parameters.
///
/// Returns `None` when the system is underdetermined or a normalization comes
/// out non-positive (the histogram seeds are kept in that case).
fn solve_norms(hist: &Histogram1D, model: &Model, theta: &[f64], range: Option<FitRange>) -> Option<Vec<f64>> {
    let range = resolve_range(hist, range).ok()?;
    let data = collect_bins(hist, range);
    let k = model.components().len();
    if data.len() <= k {
        return None;
    }

    let mut unit = theta.to_vec();
    for idx in model.norm_indices() {
        unit[idx] = 1.0;
    }

    let mut xw = DMatrix::<f64>::zeros(data.len(), k);
    let mut yw = DVector::<f64>::zeros(data.len());
    for i in 0..data.len() {
        let shapes = model.evaluate_terms(data.x[i], &unit);
        for (j, s) in shapes.iter().enumerate() {
            xw[(i, j)] = s / data.e[i];
        }
        yw[i] = data.y[i] / data.e[i];
    }

    let beta = solve_least_squares(&xw, &yw)?;
    if beta.iter().all(|b| b.is_finite() && *b > 0.0) {
        Some(beta.iter().copied().collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Distribution, Sampler};

    #[test]
    fn explicit_guess_is_returned_unchanged() {
        let h = Histogram1D::new(10, 0.0, 1.0).unwrap();
        let model = Model::gaussian().with_guess(vec![40.0, 5.0, 1.0]).unwrap();
        assert_eq!(initial_guess(&h, &model, None), vec![40.0, 5.0, 1.0]);
    }

    #[test]
    fn norms_are_solved_on_the_data_scale() {
        let mut sampler = Sampler::new(8);
        let mut h = Histogram1D::new(100, 0.0, 2.0).unwrap();
        for _ in 0..50_000 {
            h.fill(sampler.draw(Distribution::Gaussian { mean: 0.5, sigma: 0.2 }).unwrap());
        }
        let g = initial_guess(&h, &Model::gaussian(), None);
        // Expected peak: N·w / (σ·sqrt(2π)) ≈ 1995
        assert!((g[0] - 1995.0).abs() < 200.0, "norm guess {}", g[0]);
        assert!((g[1] - 0.5).abs() < 0.05);
        assert!((g[2] - 0.2).abs() < 0.05);
    }

    #[test]
    fn composite_guess_finds_peak_over_background() {
        let mut sampler = Sampler::new(42);
        let mut h = Histogram1D::new(100, 2.0, 4.0).unwrap();
        for _ in 0..500 {
            h.fill(sampler.draw(Distribution::Gaussian { mean: 3.097, sigma: 0.05 }).unwrap());
        }
        for _ in 0..2000 {
            h.fill(
                sampler
                    .draw(Distribution::ShiftedExponential { origin: 2.0, rate: 1.25 })
                    .unwrap(),
            );
        }
        let g = initial_guess(&h, &Model::exponential_plus_gaussian(), None);
        assert!(g[1] < 0.0, "slope guess {}", g[1]);
        assert!((g[3] - 3.097).abs() < 0.05, "mean guess {}", g[3]);
        assert!(g[4] > 0.0 && g[4] < 0.2, "sigma guess {}", g[4]);
    }
}
