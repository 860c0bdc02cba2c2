//! Error types for storymap-store operations.

use std::io;
use thiserror::Error;

/// The error type for storymap-store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A front-matter block could not be produced.
    #[error("Invalid front-matter: {0}")]
    FrontMatter(String),
}

/// A specialized Result type for storymap-store operations.
pub type Result<T> = std::result::Result<T, Error>;
