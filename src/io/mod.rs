//! Input/output helpers.
//!
//! - plain-text sample ingest with skipped-line accounting (`ingest`)
//! - sample writers (`export`)
//! - JSON store for histograms and fit results (`store`)

pub mod export;
pub mod ingest;
pub mod store;

pub use export::*;
pub use ingest::*;
pub use store::*;
