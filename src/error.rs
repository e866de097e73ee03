//! Error types for feedmerge.

use thiserror::Error;

/// Common error type for feedmerge.
#[derive(Error, Debug)]
pub enum FeedmergeError {
    /// Database error.
    ///
    /// Wraps errors from whichever sqlx backend the crate was built with.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feed retrieval error (network, HTTP status, size limit, URL policy).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Feed document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Local snapshot could not be read or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Validation error for input values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FeedmergeError {
    fn from(e: sqlx::Error) -> Self {
        FeedmergeError::Database(e.to_string())
    }
}

impl From<csv::Error> for FeedmergeError {
    fn from(e: csv::Error) -> Self {
        FeedmergeError::Snapshot(e.to_string())
    }
}

/// Result type alias for feedmerge operations.
pub type Result<T> = std::result::Result<T, FeedmergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FeedmergeError::Fetch("HTTP error: 503".to_string());
        assert_eq!(err.to_string(), "fetch error: HTTP error: 503");
    }

    #[test]
    fn test_snapshot_error_display() {
        let err = FeedmergeError::Snapshot("truncated row".to_string());
        assert_eq!(err.to_string(), "snapshot error: truncated row");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeedmergeError = io_err.into();
        assert!(matches!(err, FeedmergeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: FeedmergeError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, FeedmergeError::Database(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FeedmergeError::Parse("not xml".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
