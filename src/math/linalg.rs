//! Small dense solvers.
//!
//! Two kinds of problems show up while fitting:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2          (linear normalizations, SVD)
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr               (damped Gauss-Newton step, Cholesky)
//! ```
//!
//! Parameter counts are tiny (2–8), so clarity wins over speed here.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `(A + λ·diag(A)) δ = g` for a symmetric positive semi-definite `A`.
///
/// Returns `None` when the damped matrix is not positive definite.
pub fn solve_damped(a: &DMatrix<f64>, g: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut damped = a.clone();
    for k in 0..damped.nrows() {
        damped[(k, k)] *= 1.0 + lambda;
    }
    let delta = damped.cholesky()?.solve(g);
    if delta.iter().all(|v| v.is_finite()) {
        Some(delta)
    } else {
        None
    }
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_spd(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = a.clone().cholesky()?.inverse();
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
