//! Error types for nodedocs.
//!
//! Library crates use [`NodeDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all nodedocs operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeDocsError {
    /// Configuration loading or validation error. Always fatal.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A single node could not be rendered into a document body.
    #[error("render error for {node}: {message}")]
    Render { node: String, message: String },

    /// Data validation error (bad input records, broken offsets, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON or TOML serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NodeDocsError>;

impl NodeDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a render error for the given node identity.
    pub fn render(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Render {
            node: node.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
