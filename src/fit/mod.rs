//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - Levenberg–Marquardt chi-square fits of a model to histogram bins
//! - initial-guess seeding from histogram shape
//! - fitting several candidate models and keeping the best chi2/ndf
//! - independent fits in parallel

pub mod batch;
pub mod fitter;
pub mod guess;
pub mod selection;

pub use batch::*;
pub use fitter::*;
pub use guess::*;
pub use selection::*;
