//! Error types for sharpgraph.
//!
//! Every error is scoped to one file or one edit. A resolution miss is
//! deliberately *not* represented here: unresolvable names produce no link
//! and no diagnostic, because the supported language subset is incomplete.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The grammar rejected a file. The whole file is treated as unparsable;
    /// the rest of the model stays intact.
    #[error("parse error in {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// Regenerated source text failed to re-parse. The edit that produced it
    /// must be rolled back, never committed.
    #[error("regenerated text for {file} failed validation: {message}")]
    RegenerationValidation { file: PathBuf, message: String },

    /// An edit patch pointed at a declaration that does not exist.
    #[error("no declaration at {0}")]
    UnknownTarget(String),

    /// The path is not a C# source file.
    #[error("unsupported file: {0}")]
    UnsupportedFile(PathBuf),

    /// The model service actor has shut down.
    #[error("model service is not running")]
    ServiceClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
