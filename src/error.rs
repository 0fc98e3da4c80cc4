//! Custom error types for egw-library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for library operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Language not found: {0}")]
    LanguageNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Book {0} has no paragraphs")]
    EmptyContent(i64),

    #[error("Search query error: {0}")]
    Query(String),

    #[error("PDF generation failed: {0}")]
    Generation(String),

    #[error("Job is not completed (status: {status}, progress: {progress}%)")]
    JobNotReady { status: String, progress: u8 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse error classification shared with callers and job records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    EmptyContent,
    QueryError,
    GenerationFailure,
    InvalidRequest,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::EmptyContent => write!(f, "empty_content"),
            ErrorKind::QueryError => write!(f, "query_error"),
            ErrorKind::GenerationFailure => write!(f, "generation_failure"),
            ErrorKind::InvalidRequest => write!(f, "invalid_request"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BookNotFound(_)
            | Error::LanguageNotFound(_)
            | Error::JobNotFound(_) => ErrorKind::NotFound,
            Error::EmptyContent(_) => ErrorKind::EmptyContent,
            Error::Query(_) => ErrorKind::QueryError,
            Error::Generation(_) => ErrorKind::GenerationFailure,
            Error::JobNotReady { .. } | Error::InvalidInput(_) => ErrorKind::InvalidRequest,
            Error::Config(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code a handler should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::QueryError | ErrorKind::InvalidRequest => 400,
            ErrorKind::EmptyContent => 422,
            ErrorKind::GenerationFailure | ErrorKind::Internal => 500,
        }
    }
}

/// Result type alias for egw-library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::JobNotFound("abc".into()).status_code(), 404);
        assert_eq!(Error::BookNotFound(7).status_code(), 404);
        assert_eq!(
            Error::JobNotReady {
                status: "generating".into(),
                progress: 50
            }
            .status_code(),
            400
        );
        assert_eq!(Error::Query("fts5: syntax error".into()).status_code(), 400);
        assert_eq!(Error::EmptyContent(1).status_code(), 422);
    }

    #[test]
    fn test_not_ready_message_echoes_progress() {
        let err = Error::JobNotReady {
            status: "generating".into(),
            progress: 62,
        };
        assert!(err.to_string().contains("62%"));
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_empty_content_is_distinct_from_not_found() {
        assert_eq!(Error::EmptyContent(3).kind(), ErrorKind::EmptyContent);
        assert_eq!(Error::BookNotFound(3).kind(), ErrorKind::NotFound);
    }
}
