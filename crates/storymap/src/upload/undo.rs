//! Reversible record of tracker artifacts created by an upload.

use crate::tracker::Tracker;
use std::fmt;
use tracing::{debug, warn};

/// Inverse of one creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// Delete an issue created by the upload.
    DeleteIssue(u64),
    /// Delete a label created by the upload.
    DeleteLabel(String),
    /// Delete a note the upload added to an issue.
    DeleteNote {
        /// Issue holding the note
        iid: u64,
        /// Note to delete
        note_id: u64,
    },
}

impl fmt::Display for UndoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoAction::DeleteIssue(iid) => write!(f, "issue #{iid}"),
            UndoAction::DeleteLabel(name) => write!(f, "label '{name}'"),
            UndoAction::DeleteNote { iid, note_id } => write!(f, "note {note_id} on issue #{iid}"),
        }
    }
}

/// Result of a rollback.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// Artifacts deleted
    pub rolled_back: usize,
    /// Artifacts that could not be deleted, with the reason
    pub failures: Vec<String>,
}

/// Stack of undo actions, replayed newest first.
///
/// Labels are created before issues and notes after them, so replaying the
/// stack deletes notes first, then issues, then labels.
#[derive(Debug, Default)]
pub struct UndoLog {
    actions: Vec<UndoAction>,
}

impl UndoLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the inverse of a successful creation.
    pub fn record(&mut self, action: UndoAction) {
        self.actions.push(action);
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Undo every recorded creation, newest first.
    ///
    /// A failed deletion is logged and collected; the remaining actions still
    /// run.
    pub async fn rollback(self, tracker: &dyn Tracker) -> RollbackOutcome {
        let mut outcome = RollbackOutcome::default();
        for action in self.actions.into_iter().rev() {
            let result = match &action {
                UndoAction::DeleteIssue(iid) => tracker.delete_issue(*iid).await,
                UndoAction::DeleteLabel(name) => tracker.delete_label(name).await,
                UndoAction::DeleteNote { iid, note_id } => tracker.delete_note(*iid, *note_id).await,
            };
            match result {
                Ok(()) => {
                    debug!(artifact = %action, "Rolled back");
                    outcome.rolled_back += 1;
                }
                Err(e) => {
                    warn!(artifact = %action, error = %e, "Rollback failed");
                    outcome.failures.push(format!("{action}: {e}"));
                }
            }
        }
        outcome
    }
}
