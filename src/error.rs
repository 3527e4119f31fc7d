//! Error types for Gator.

use thiserror::Error;

use crate::feed::FetchError;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for operator input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error (bad config file or bad interval).
    #[error("configuration error: {0}")]
    Config(String),

    /// Feed retrieval or parsing error.
    #[error("feed error: {0}")]
    Fetch(#[from] FetchError),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
