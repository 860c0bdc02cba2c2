//! Error types for storymap operations.

use crate::tracker::TrackerError;
use std::io;
use thiserror::Error;

/// Configuration problems detected before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.storymap/` directory was found.
    #[error("Not a storymap repository (or any parent directory). Run 'storymap init' first.")]
    NotInitialized,

    /// A required setting is empty.
    #[error("Missing required setting '{field}'. Set it in .storymap/config.yaml or via {env_var}.")]
    MissingField {
        /// Dotted config key.
        field: &'static str,
        /// Environment variable that can provide it.
        env_var: &'static str,
    },

    /// A setting has an unusable value.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted config key or environment variable.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("Could not parse configuration: {0}")]
    Parse(String),
}

/// The error type for storymap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tracker rejected a request or could not be reached.
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Persistence layer error.
    #[error("Storage error: {0}")]
    Store(#[from] storymap_store::Error),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The project map violates a structural invariant.
    #[error("Invalid project map: {0}")]
    InvalidMap(String),

    /// A proposed plan cannot be materialized.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Rebuilding the map would discard proposed issues not uploaded yet.
    #[error(
        "{0} proposed issue(s) have not been uploaded; run `storymap upload` first or pass --force to discard them"
    )]
    PendingProposals(usize),

    /// An upload failed and its created artifacts were rolled back.
    #[error("Failed to upload artifacts: {message} (rolled back {rolled_back} artifact(s), {} rollback failure(s))", .rollback_failures.len())]
    UploadAborted {
        /// Description of the failure that triggered the rollback.
        message: String,
        /// Number of artifacts deleted during rollback.
        rolled_back: usize,
        /// Artifacts that could not be deleted.
        rollback_failures: Vec<String>,
    },
}

/// A specialized Result type for storymap operations.
pub type Result<T> = std::result::Result<T, Error>;
