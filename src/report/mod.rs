//! Reporting: structured fit summaries and formatted terminal output.

pub mod format;

use serde::{Deserialize, Serialize};

use crate::domain::{FitRange, FitResult};

pub use format::{format_comparison, format_fit_report, format_histogram_summary};

/// One row of a fit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamLine {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

/// Flat summary of a [`FitResult`] for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub model: String,
    pub params: Vec<ParamLine>,
    pub chi2: f64,
    pub ndf: usize,
    pub chi2_per_ndf: f64,
    pub probability: f64,
    pub bins_used: usize,
    pub range: FitRange,
}

impl FitReport {
    pub fn from_result(fit: &FitResult) -> Self {
        Self {
            model: fit.model.name().to_string(),
            params: fit
                .params
                .iter()
                .map(|p| ParamLine {
                    name: p.name.clone(),
                    value: p.value,
                    error: p.error,
                })
                .collect(),
            chi2: fit.chi2,
            ndf: fit.ndf,
            chi2_per_ndf: fit.chi2_per_ndf(),
            probability: fit.probability,
            bins_used: fit.bins_used,
            range: fit.range,
        }
    }
}
