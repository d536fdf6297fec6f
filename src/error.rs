//! Error types for feedbell.

use thiserror::Error;

/// Common error type for feedbell.
#[derive(Error, Debug)]
pub enum FeedbellError {
    /// Store failure.
    ///
    /// Wraps errors from the persistence layer. Errors from sqlx are
    /// converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed could not be reached or parsed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A notification could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// The chat platform rejected or failed a non-delivery request.
    #[error("bot API error: {0}")]
    Bot(String),

    /// The record clashes with an existing one (e.g. a feed URL that is
    /// already subscribed).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Another scan is still running.
    #[error("a scan is already in progress")]
    ScanInProgress,
}

// Conversion from sqlx errors
impl From<sqlx::Error> for FeedbellError {
    fn from(e: sqlx::Error) -> Self {
        FeedbellError::Database(e.to_string())
    }
}

/// Result type alias for feedbell operations.
pub type Result<T> = std::result::Result<T, FeedbellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FeedbellError::Fetch("HTTP error: 404 Not Found".to_string());
        assert_eq!(err.to_string(), "fetch error: HTTP error: 404 Not Found");
    }

    #[test]
    fn test_delivery_error_display() {
        let err = FeedbellError::Delivery("chat not found".to_string());
        assert_eq!(err.to_string(), "delivery error: chat not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = FeedbellError::Conflict("feed already subscribed".to_string());
        assert_eq!(err.to_string(), "conflict: feed already subscribed");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FeedbellError::NotFound("subscription".to_string());
        assert_eq!(err.to_string(), "subscription not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeedbellError = io_err.into();
        assert!(matches!(err, FeedbellError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FeedbellError::ScanInProgress)
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
