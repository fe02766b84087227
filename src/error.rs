//! Error types.
//!
//! The library reports typed [`FitError`]s; the `binfit` binary converts them
//! into an [`AppError`] carrying a process exit code.

use thiserror::Error;

/// Failures of the sampling / histogram / fitting core.
#[derive(Debug, Error)]
pub enum FitError {
    /// Malformed distribution, histogram, model or fit parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Not enough usable bins for the number of free parameters.
    #[error("insufficient data: {bins} usable bins for {params} free parameters")]
    InsufficientData { bins: usize, params: usize },

    /// Degenerate fit geometry (zero Jacobian columns, non-invertible normal matrix).
    #[error("singular Jacobian: {0}")]
    SingularJacobian(String),

    /// Iteration budget exhausted before the chi-square reduction met the tolerance.
    #[error("fit did not converge after {iterations} iterations (chi2={chi2:.6})")]
    Convergence { iterations: usize, chi2: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FitError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidParameter(message.into())
    }

    /// Exit code used by the binary for this failure class.
    ///
    /// - `2`: bad input (parameters, files)
    /// - `3`: not enough data to fit
    /// - `4`: numerical failure
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidParameter(_) | FitError::Io(_) | FitError::Json(_) => 2,
            FitError::InsufficientData { .. } => 3,
            FitError::SingularJacobian(_) | FitError::Convergence { .. } => 4,
        }
    }
}

/// Result alias for the library core.
pub type Result<T> = std::result::Result<T, FitError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
