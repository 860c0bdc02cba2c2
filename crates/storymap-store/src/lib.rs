//! Persistence primitives for storymap project state.
//!
//! The project map, the timestamp cache and every per-issue markdown file are
//! read whole and rewritten whole. This crate provides the three pieces that
//! make that safe:
//!
//! - [`atomic`]: temp-file-then-rename replacement so a crash never leaves a
//!   half-written document behind.
//! - [`recover`]: resilient loading where a corrupt document is reported as a
//!   [`Warning`] and replaced by its default value instead of failing.
//! - [`frontmatter`]: composing and splitting the YAML front-matter block that
//!   heads each issue file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod frontmatter;
pub mod recover;
pub mod warning;

pub use atomic::{write_atomic, write_json_atomic, write_yaml_atomic};
pub use error::{Error, Result};
pub use frontmatter::{compose, split, FrontMatter};
pub use recover::{load_json_or_default, load_yaml_or_default, Loaded};
pub use warning::Warning;
