//! `binfit` library crate.
//!
//! Seeded sampling, fixed-width 1D/2D histograms with per-bin uncertainties,
//! parametric models (Gaussian, exponential, Breit-Wigner and sums of them) and
//! Levenberg–Marquardt chi-square fits with parameter errors.
//!
//! The binary (`binfit`) is a thin wrapper around this library so the core
//! logic is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hist;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
