//! Error types for trueno-datamodel operations.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trueno-datamodel operations.
///
/// Soft conditions (unresolved roles, empty sources, non-matching patterns)
/// are not represented here; they degrade to default values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// An index range fell outside the current array bounds.
    #[error("index out of range: {index}+{count} exceeds array length {len}")]
    IndexOutOfRange {
        /// First index of the requested range.
        index: usize,
        /// Number of items the call wanted to touch.
        count: usize,
        /// Array length at the time of the call.
        len: usize,
    },

    /// A role pattern failed to compile.
    #[error("invalid role pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Index error for a `count`-item range starting at `index`.
    pub(crate) fn out_of_range(index: usize, count: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            index,
            count,
            len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_out_of_range_display() {
        let err = Error::IndexOutOfRange {
            index: 5,
            count: 1,
            len: 5,
        };
        let display = err.to_string();
        assert!(display.contains("index out of range"));
        assert!(display.contains("5+1"));
        assert!(display.contains("length 5"));
    }

    #[test]
    fn test_invalid_pattern_conversion() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: Error = regex_err.into();
        assert!(matches!(err, Error::InvalidPattern(_)));
        assert!(err.to_string().contains("invalid role pattern"));
    }

    #[test]
    fn test_config_parse_includes_line() {
        let err = Error::ConfigParse {
            line: 42,
            message: "invalid value".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("42"), "Error should include line number: {}", display);
        assert!(display.contains("invalid value"));
    }

    #[test]
    fn test_config_invalid_includes_key() {
        let err = Error::ConfigInvalid {
            key: "spectrum.bands".to_string(),
            message: "must be positive".to_string(),
        };
        assert!(err.to_string().contains("spectrum.bands"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
