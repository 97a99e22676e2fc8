//! Error types.
//!
//! - `FetchError` covers a single indicator download (network, HTTP status,
//!   upstream error payloads, unexpected JSON shapes).
//! - `AppError` is what crosses the application boundary; it carries the
//!   process exit code used by the `won` binary.

use thiserror::Error;

/// Exit code for usage/configuration problems.
pub const EXIT_USAGE: u8 = 2;

/// Exit code for data/network failures.
pub const EXIT_DATA: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure of one indicator fetch.
///
/// An empty result is not an error; neither is a page that keeps reporting
/// no items (that ends pagination).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Transport failure or timeout.
    #[error("request failed: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("request failed with status {0}")]
    Status(u16),
    /// Structured error payload returned by the API.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Payload did not have the expected shape.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// True for transport-level failures (network, timeout, HTTP status).
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Status(_))
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::data(err.to_string())
    }
}
