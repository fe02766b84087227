//! Fixed-width histograms.
//!
//! - `binning`: equal-width partition of `[lo, hi)`
//! - `hist1d` / `hist2d`: weighted bin accumulation with per-bin uncertainty,
//!   running moments and projections

pub mod binning;
pub mod hist1d;
pub mod hist2d;

pub use binning::*;
pub use hist1d::*;
pub use hist2d::*;
