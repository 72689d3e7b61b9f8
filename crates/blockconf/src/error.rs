//! Error types for block config files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a block config file.
#[derive(Debug, Error)]
pub enum Error {
    /// A body line did not split into a key and a value
    #[error("invalid config syntax at line {line}: {message}")]
    Parse {
        /// Line number where the parse error occurred (1-indexed)
        line: usize,
        /// Description of the syntax error
        message: String,
    },

    /// An anchor value that can't be turned into a search pattern
    #[error("invalid anchor pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error on a specific file
    #[error("failed to access {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

/// Result type alias for block config operations.
pub type Result<T> = std::result::Result<T, Error>;
