//! Error types for statement processing.
//!
//! This module defines [`StatementsError`] which covers every failure that can surface
//! while extracting, normalizing, storing or comparing financial statements. Unmapped
//! labels, short value rows and metric evaluation problems are recovered locally and
//! never show up here.

use thiserror::Error;

/// Errors that can occur during statement operations.
#[derive(Error, Debug)]
pub enum StatementsError {
    /// The extraction provider reported an error for the source document.
    ///
    /// The message is passed through unchanged from upstream.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing data from a provider or the store.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error reading from or writing to the statement store.
    #[error("Store error: {0}")]
    Store(String),

    /// The requested source document or record set was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A metric name that is neither a direct column nor a derived metric.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Invalid configuration (dictionary rules, patterns, limits).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for StatementsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result type alias using [`StatementsError`].
pub type Result<T> = std::result::Result<T, StatementsError>;
