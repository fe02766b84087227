//! Linear-algebra helpers for the fitter.

pub mod linalg;

pub use linalg::*;
