//! `wealth-of-nations` library crate.
//!
//! The binary (`won`) is a thin wrapper around this library so that:
//!
//! - the fetch/merge/select/correlate pipeline is testable without a network
//! - chart objects can be reused by other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod transform;
pub mod tui;
pub mod viz;
