//! Parametric peak and background shapes.
//!
//! Models are a tagged list of terms summed together, so fitting code can stay
//! generic over the shape.

pub mod model;

pub use model::*;
