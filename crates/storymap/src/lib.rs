//! Storymap - keeps a hierarchical local story map in sync with a remote
//! issue tracker.
//!
//! Remote issues are projected into a file tree (Backbone → Epic → Story) and
//! a serialized project map; newly planned local entries are promoted back to
//! the tracker as real issues with labels, links and dependency notes.
//!
//! The core components are:
//!
//! - [`paths`]: canonical file path for an issue from its title and labels
//! - [`relations`]: typed edges from textual directives and structural links
//! - [`timestamps`]: the persisted id → `updated_at` cache
//! - [`mapper`]: full remote → local projection
//! - [`sync`]: incremental change detection
//! - [`upload`]: local → remote promotion with rollback

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod config;
pub mod domain;
pub mod error;
pub mod mapper;
pub mod paths;
pub mod plan;
pub mod relations;
pub mod sync;
pub mod timestamps;
pub mod tracker;
pub mod upload;
pub mod workspace;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Application context
pub mod app;

// Internal modules (not exposed as public API)
pub(crate) mod output;
