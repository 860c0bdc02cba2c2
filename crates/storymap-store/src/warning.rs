//! Warning types for non-fatal problems found while loading state.
//!
//! A corrupt cache or map file is not an error for storymap: the document is
//! treated as absent and the caller is handed a [`Warning`] describing what
//! was discarded, so it can be logged or shown to the user.

use std::fmt;
use std::path::PathBuf;

/// A non-fatal warning produced while loading a persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The document exists but could not be parsed.
    ///
    /// The default value was used in its place.
    CorruptDocument {
        /// Path of the discarded document.
        path: PathBuf,
        /// A description of the parse error.
        error: String,
    },

    /// The document was empty (or whitespace only).
    ///
    /// The default value was used in its place.
    EmptyDocument {
        /// Path of the empty document.
        path: PathBuf,
    },
}

impl Warning {
    /// Returns the path of the document the warning refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Warning::CorruptDocument { path, .. } | Warning::EmptyDocument { path } => path,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CorruptDocument { path, error } => {
                write!(f, "Ignored corrupt document {}: {}", path.display(), error)
            }
            Warning::EmptyDocument { path } => {
                write!(f, "Ignored empty document {}", path.display())
            }
        }
    }
}
