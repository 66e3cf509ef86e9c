//! Error types for the spimi library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`SpimiError`] enum. Looking up a term that is not in a dictionary is not an
//! error: the query layer reports it as `None`.
//!
//! # Examples
//!
//! ```
//! use spimi::error::{Result, SpimiError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SpimiError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for spimi operations.
#[derive(Error, Debug)]
pub enum SpimiError {
    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage backend errors (missing file, closed storage, failed rename...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A persisted block or dictionary line could not be parsed.
    #[error("Parse error in {file} at line {line}: {message}")]
    Parse {
        /// Name of the file being read.
        file: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A term that cannot be written in the line format.
    #[error("Invalid term {term:?}: {reason}")]
    InvalidTerm {
        /// The offending term.
        term: String,
        /// Why it cannot be persisted.
        reason: String,
    },

    /// Query-related errors (malformed query strings).
    #[error("Query error: {0}")]
    Query(String),

    /// A record producer failed.
    #[error("Worker for partition {partition} failed: {message}")]
    Worker {
        /// Partition index the worker was assigned.
        partition: usize,
        /// The producer's error message.
        message: String,
    },

    /// Thread join errors
    #[error("Thread join error: {0}")]
    ThreadJoinError(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SpimiError.
pub type Result<T> = std::result::Result<T, SpimiError>;

impl SpimiError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        SpimiError::Storage(msg.into())
    }

    /// Create a new parse error for `file` at 1-based `line`.
    pub fn parse<F: Into<String>, S: Into<String>>(file: F, line: usize, msg: S) -> Self {
        SpimiError::Parse {
            file: file.into(),
            line,
            message: msg.into(),
        }
    }

    /// Create a new invalid term error.
    pub fn invalid_term<T: Into<String>, S: Into<String>>(term: T, reason: S) -> Self {
        SpimiError::InvalidTerm {
            term: term.into(),
            reason: reason.into(),
        }
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SpimiError::Query(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SpimiError::Other(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SpimiError::Other(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SpimiError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        SpimiError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Whether this error came from reading a malformed persisted file.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, SpimiError::Parse { .. })
    }
}
