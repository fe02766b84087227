//! Model comparison (e.g. Gaussian vs Breit-Wigner) by chi2/ndf.
//!
//! Each candidate is fitted independently from its own initial guess. Rules:
//! 1. Candidates that fail to fit are recorded as skipped, with the reason
//! 2. The lowest chi2/ndf wins
//! 3. Ties go to the model with fewer parameters, then to the earlier candidate

use std::cmp::Ordering;

use tracing::warn;

use crate::domain::{FitRange, FitResult};
use crate::error::{FitError, Result};
use crate::fit::fitter::{FitOptions, fit};
use crate::fit::guess::initial_guess;
use crate::hist::Histogram1D;
use crate::models::Model;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: FitResult,
    /// Position of `best` within `fits`.
    pub best_index: usize,
    /// Successful fits in candidate order.
    pub fits: Vec<FitResult>,
    /// Candidates that failed, as `(model name, reason)`.
    pub skipped: Vec<(String, String)>,
}

/// Fit every candidate and select the best.
///
/// Fails with the first candidate's error when no candidate fits.
pub fn fit_candidates(
    hist: &Histogram1D,
    models: &[Model],
    range: Option<FitRange>,
    options: &FitOptions,
) -> Result<FitSelection> {
    if models.is_empty() {
        return Err(FitError::invalid("no candidate models to fit"));
    }

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    let mut first_err = None;

    for model in models {
        let guess = initial_guess(hist, model, range);
        match fit(hist, model, &guess, range, options) {
            Ok(result) => fits.push(result),
            Err(e) => {
                warn!(model = model.name(), error = %e, "candidate fit failed");
                skipped.push((model.name().to_string(), e.to_string()));
                first_err.get_or_insert(e);
            }
        }
    }

    let Some(best_index) = select_best(&fits) else {
        return Err(first_err.unwrap_or_else(|| FitError::invalid("no candidate models to fit")));
    };
    let best = fits[best_index].clone();

    Ok(FitSelection { best, best_index, fits, skipped })
}

/// Index of the winning fit.
fn select_best(fits: &[FitResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, f) in fits.iter().enumerate() {
        best = match best {
            None => Some(i),
            Some(j) => {
                let b = &fits[j];
                let by_quality = f
                    .chi2_per_ndf()
                    .partial_cmp(&b.chi2_per_ndf())
                    .unwrap_or(Ordering::Equal);
                let better = by_quality == Ordering::Less
                    || (by_quality == Ordering::Equal && f.params.len() < b.params.len());
                if better { Some(i) } else { Some(j) }
            }
        };
    }
    best
}
