//! Metric error types.

use thiserror::Error;

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;

/// Errors returned by the metrics API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MetricError {
    /// Invalid configuration, such as malformed histogram boundaries.
    #[error("Configuration error: {0}")]
    Config(String),
}
