//! Pseudo-random sample generation.

pub mod sample;

pub use sample::*;
