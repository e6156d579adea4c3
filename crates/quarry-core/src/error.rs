//! Error types for Quarry core operations.
//!
//! Two families live here. `QuarryError` covers failures that stop an
//! operation (a missing library, a broken config file, evaluating a query
//! that did not parse). `ParseError` covers problems found while parsing a
//! query string; those are collected on the `Query` instead of being
//! returned, so one bad term never hides the rest of the query.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using QuarryError
pub type Result<T> = std::result::Result<T, QuarryError>;

/// Core error types for Quarry operations.
#[derive(Error, Debug)]
pub enum QuarryError {
    // === Query Errors ===
    /// The query collected parse errors and must not be evaluated
    #[error("invalid query: {}", messages.join("; "))]
    InvalidQuery { messages: Vec<String> },

    // === Library Errors ===
    /// The library directory is missing
    #[error("library not found at {path}")]
    LibraryNotFound { path: PathBuf },

    /// A book file exists but could not be understood
    #[error("book file {path} is corrupted: {reason}")]
    BookCorrupted { path: PathBuf, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl QuarryError {
    /// Returns true if this error was caused by the query text itself
    pub fn is_query_error(&self) -> bool {
        matches!(self, QuarryError::InvalidQuery { .. })
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        QuarryError::ConfigError {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization(err.to_string())
    }
}

/// A problem found in one term of a query string.
///
/// The offending term is dropped; parsing carries on with the next token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The term could not be compiled as a regular expression
    #[error("invalid regular expression: {term}")]
    InvalidRegularExpression { term: String, reason: String },

    /// The term is not a `[since][-[until]]` digit range
    #[error("invalid date: {term}")]
    InvalidDateRange { term: String },
}

impl ParseError {
    /// The raw term that caused this error
    pub fn term(&self) -> &str {
        match self {
            ParseError::InvalidRegularExpression { term, .. } => term,
            ParseError::InvalidDateRange { term } => term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_query_error() {
        let err = QuarryError::InvalidQuery {
            messages: vec!["invalid date: abc".to_string()],
        };
        assert!(err.is_query_error());

        let err = QuarryError::LibraryNotFound {
            path: PathBuf::from("/missing"),
        };
        assert!(!err.is_query_error());
    }

    #[test]
    fn test_invalid_query_message() {
        let err = QuarryError::InvalidQuery {
            messages: vec!["invalid date: abc".to_string(), "invalid date: x".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid query: invalid date: abc; invalid date: x"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::InvalidDateRange {
            term: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid date: abc");
        assert_eq!(err.term(), "abc");

        let err = ParseError::InvalidRegularExpression {
            term: "[".to_string(),
            reason: "unclosed class".to_string(),
        };
        assert_eq!(err.to_string(), "invalid regular expression: [");
    }
}
