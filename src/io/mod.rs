//! Input/output helpers.
//!
//! - table and correlation exports (CSV)
//! - chart descriptions (JSON)

pub mod export;

pub use export::*;
