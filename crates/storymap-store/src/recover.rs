//! Resilient loading of persisted documents.
//!
//! Loading never fails because of the *content* of a document. A missing file
//! yields the default value silently; an empty or unparseable file yields the
//! default value together with a [`Warning`]. Only genuine I/O failures (for
//! example a permission error) are returned as errors.

use crate::{Result, Warning};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

/// A loaded document plus the warning raised while loading it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    /// The parsed document, or the default value when recovery kicked in.
    pub value: T,
    /// Set when the on-disk content was discarded.
    pub warning: Option<Warning>,
}

impl<T> Loaded<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// Returns `true` if the on-disk document was discarded.
    pub fn recovered(&self) -> bool {
        self.warning.is_some()
    }
}

/// Loads a YAML document, falling back to `T::default()` when it is missing or
/// corrupt.
///
/// # Errors
///
/// Returns an error only when the file exists but cannot be read.
pub async fn load_yaml_or_default<T, P>(path: P) -> Result<Loaded<T>>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    load_with(path.as_ref(), |content| {
        serde_yaml::from_str::<T>(content).map_err(|e| e.to_string())
    })
    .await
}

/// Loads a JSON document, falling back to `T::default()` when it is missing or
/// corrupt.
///
/// # Errors
///
/// Returns an error only when the file exists but cannot be read.
pub async fn load_json_or_default<T, P>(path: P) -> Result<Loaded<T>>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    load_with(path.as_ref(), |content| {
        serde_json::from_str::<T>(content).map_err(|e| e.to_string())
    })
    .await
}

async fn load_with<T, F>(path: &Path, parse: F) -> Result<Loaded<T>>
where
    T: Default,
    F: FnOnce(&str) -> std::result::Result<T, String>,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Document absent, using default");
            return Ok(Loaded::clean(T::default()));
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            // Not valid UTF-8: the bytes are unusable, same as a parse failure.
            return Ok(recovered(Warning::CorruptDocument {
                path: path.to_path_buf(),
                error: e.to_string(),
            }));
        }
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(recovered(Warning::EmptyDocument {
            path: path.to_path_buf(),
        }));
    }

    match parse(&content) {
        Ok(value) => Ok(Loaded::clean(value)),
        Err(error) => Ok(recovered(Warning::CorruptDocument {
            path: path.to_path_buf(),
            error,
        })),
    }
}

fn recovered<T: Default>(warning: Warning) -> Loaded<T> {
    tracing::warn!("{warning}");
    Loaded {
        value: T::default(),
        warning: Some(warning),
    }
}
