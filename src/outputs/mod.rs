//! Output of a run's results.
//!
//! # Submodules
//!
//! - [`json`]: Writes a run's articles to dated JSON files per domain

pub mod json;
