//! Panel transforms: cross-section selection and correlation.

pub mod correlation;
pub mod latest;

pub use correlation::{correlation_matrix, pearson};
pub use latest::latest_complete;
