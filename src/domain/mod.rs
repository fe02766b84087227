//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - axis / range selectors (`Axis`, `FitRange`)
//! - fit outputs (`FitResult`, `ParamEstimate`)
//! - run configuration consumed by the pipeline (`RunConfig`, `GenerateConfig`, ...)

pub mod types;

pub use types::*;
