//! Issue tracker capability interface.
//!
//! The engine talks to the remote tracker only through the [`Tracker`]
//! trait. [`GitlabTracker`] implements it against the GitLab REST API; a
//! stateful in-memory [`MockTracker`] is available for tests when the
//! `test-util` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! storymap = { version = "...", features = ["test-util"] }
//! ```
//!
//! All calls are scoped to the single project the tracker was built for.

use crate::domain::{Board, BoardList, Issue, Label, LinkedIssue, NewIssue, Note};
use async_trait::async_trait;
use thiserror::Error;

mod gitlab;
#[cfg(any(test, feature = "test-util"))]
mod mock;

pub use gitlab::GitlabTracker;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockTracker, TrackerCall};

/// Link type used for epic → story containment.
pub const RELATES_TO: &str = "relates_to";

/// Errors reported by a tracker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The tracker could not be reached or the request timed out.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource already exists (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other rejected request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The response could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Result alias for tracker calls.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Remote issue tracker operations.
///
/// Implementations must be `Send + Sync`; methods take `&self` so a single
/// client can be shared by every component of one run.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// List every issue of the project, open and closed, following
    /// pagination to the end.
    async fn list_issues(&self) -> TrackerResult<Vec<Issue>>;

    /// Fetch one issue.
    async fn get_issue(&self, iid: u64) -> TrackerResult<Issue>;

    /// Issues linked to `iid`, in tracker order.
    async fn list_issue_links(&self, iid: u64) -> TrackerResult<Vec<LinkedIssue>>;

    /// Notes (comments) on `iid`, in tracker order.
    async fn list_issue_notes(&self, iid: u64) -> TrackerResult<Vec<Note>>;

    /// All project labels.
    async fn list_labels(&self) -> TrackerResult<Vec<Label>>;

    /// Create a project label.
    async fn create_label(&self, name: &str, color: &str) -> TrackerResult<Label>;

    /// Delete a project label.
    async fn delete_label(&self, name: &str) -> TrackerResult<()>;

    /// Create an issue.
    async fn create_issue(&self, issue: &NewIssue) -> TrackerResult<Issue>;

    /// Delete an issue.
    async fn delete_issue(&self, iid: u64) -> TrackerResult<()>;

    /// Add a note to an issue.
    async fn create_note(&self, iid: u64, body: &str) -> TrackerResult<Note>;

    /// Delete a note from an issue.
    async fn delete_note(&self, iid: u64, note_id: u64) -> TrackerResult<()>;

    /// Link `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Conflict`] when the link already exists.
    async fn create_issue_link(&self, source: u64, target: u64, link_type: &str)
    -> TrackerResult<()>;

    /// Fetch a board.
    async fn get_board(&self, board_id: u64) -> TrackerResult<Board>;

    /// Lists (columns) of a board.
    async fn list_board_lists(&self, board_id: u64) -> TrackerResult<Vec<BoardList>>;

    /// Move `iid` directly after `after_iid` in board ordering.
    async fn reorder_issue(&self, iid: u64, after_iid: u64) -> TrackerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_is_object_safe() {
        let tracker: Box<dyn Tracker> = Box::new(MockTracker::new());
        drop(tracker);
    }

    #[test]
    fn api_error_message_includes_status() {
        let err = TrackerError::Api {
            status: 422,
            message: "title is missing".to_string(),
        };
        assert_eq!(err.to_string(), "API error (422): title is missing");
    }
}
