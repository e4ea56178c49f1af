//! Error types for hpra-json
//!
//! This module defines all error types used throughout the library.
//! Per-file conversion turns these into recorded outcomes; only the
//! command-line entry point ever surfaces them as a process failure.

use std::fmt;
use thiserror::Error;

/// Result type alias using hpra-json Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hpra-json operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed XML input
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Checksum ledger (CSV) error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file error
    #[error("config error: {0}")]
    Config(String),

    /// Integrity ledger content error
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Quality report rendering error
    #[error("report error: {0}")]
    Report(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true if this error means the input was not well-formed XML
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "excel")]
impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Error::Report(err.to_string())
    }
}

/// XML parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Byte offset in the source document
    pub position: Option<usize>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    /// Set the byte offset where parsing failed
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(pos) = self.position {
            write!(f, " (at byte {})", pos)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
