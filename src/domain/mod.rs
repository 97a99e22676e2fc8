//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the indicator catalog and per-run indicator selections (`catalog`)
//! - year ranges, tidy indicator series, wide country-year tables, and the
//!   correlation matrix (`types`)

pub mod catalog;
pub mod types;

pub use catalog::*;
pub use types::*;
