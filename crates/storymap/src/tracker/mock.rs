//! In-memory tracker for tests.

use super::{Tracker, TrackerError, TrackerResult};
use crate::domain::{Board, BoardList, Issue, Label, LinkedIssue, NewIssue, Note};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by [`MockTracker`], recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    /// `list_issues`
    ListIssues,
    /// `get_issue(iid)`
    GetIssue(u64),
    /// `list_issue_links(iid)`
    ListIssueLinks(u64),
    /// `list_issue_notes(iid)`
    ListIssueNotes(u64),
    /// `list_labels`
    ListLabels,
    /// `create_label(name)`
    CreateLabel(String),
    /// `delete_label(name)`
    DeleteLabel(String),
    /// `create_issue` with this title
    CreateIssue(String),
    /// `delete_issue(iid)`
    DeleteIssue(u64),
    /// `create_note`
    CreateNote {
        /// Target issue
        iid: u64,
        /// Note body
        body: String,
    },
    /// `delete_note`
    DeleteNote {
        /// Issue holding the note
        iid: u64,
        /// Deleted note
        note_id: u64,
    },
    /// `create_issue_link`
    CreateIssueLink {
        /// Linking issue
        source: u64,
        /// Linked issue
        target: u64,
    },
    /// `get_board(id)`
    GetBoard(u64),
    /// `list_board_lists(id)`
    ListBoardLists(u64),
    /// `reorder_issue`
    ReorderIssue {
        /// Moved issue
        iid: u64,
        /// Issue it was moved after
        after: u64,
    },
}

impl TrackerCall {
    /// Returns `true` for calls that change tracker state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TrackerCall::CreateLabel(_)
                | TrackerCall::DeleteLabel(_)
                | TrackerCall::CreateIssue(_)
                | TrackerCall::DeleteIssue(_)
                | TrackerCall::CreateNote { .. }
                | TrackerCall::DeleteNote { .. }
                | TrackerCall::CreateIssueLink { .. }
                | TrackerCall::ReorderIssue { .. }
        )
    }
}

type Matcher = Box<dyn Fn(&TrackerCall) -> bool + Send + Sync>;

#[derive(Default)]
struct MockState {
    issues: BTreeMap<u64, Issue>,
    links: HashMap<u64, Vec<LinkedIssue>>,
    notes: HashMap<u64, Vec<Note>>,
    labels: Vec<Label>,
    boards: HashMap<u64, (Board, Vec<BoardList>)>,
    next_note_id: u64,
    calls: Vec<TrackerCall>,
    failures: Vec<(Matcher, TrackerError)>,
}

/// Stateful in-memory [`Tracker`].
///
/// Created issues get the next free issue number. Duplicate labels and links
/// are rejected with [`TrackerError::Conflict`], like the real API. Use
/// [`MockTracker::fail_on`] to make specific calls fail.
#[derive(Default)]
pub struct MockTracker {
    state: Mutex<MockState>,
}

impl MockTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an existing issue.
    #[must_use]
    pub fn with_issue(self, issue: Issue) -> Self {
        self.state().issues.insert(issue.iid, issue);
        self
    }

    /// Seed an existing label.
    #[must_use]
    pub fn with_label(self, name: &str) -> Self {
        self.state().labels.push(Label {
            name: name.to_string(),
            color: None,
        });
        self
    }

    /// Seed a `relates_to` link between two issues.
    #[must_use]
    pub fn with_link(self, a: u64, b: u64) -> Self {
        self.state().link(a, b);
        self
    }

    /// Seed a note.
    #[must_use]
    pub fn with_note(self, iid: u64, body: &str) -> Self {
        self.state().add_note(iid, body);
        self
    }

    /// Seed a board with `(list id, label)` columns.
    #[must_use]
    pub fn with_board(self, board_id: u64, lists: &[(u64, &str)]) -> Self {
        let board = Board {
            id: board_id,
            name: format!("Board {board_id}"),
        };
        let lists = lists
            .iter()
            .map(|(id, label)| BoardList {
                id: *id,
                label: Some((*label).to_string()),
            })
            .collect();
        self.state().boards.insert(board_id, (board, lists));
        self
    }

    /// Fail every call matching `matcher` with `error`.
    ///
    /// Matching calls are still recorded but have no effect.
    pub fn fail_on<F>(&self, matcher: F, error: TrackerError)
    where
        F: Fn(&TrackerCall) -> bool + Send + Sync + 'static,
    {
        self.state().failures.push((Box::new(matcher), error));
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state().calls.clone()
    }

    /// Current issues, by issue number.
    pub fn issues(&self) -> Vec<Issue> {
        self.state().issues.values().cloned().collect()
    }

    /// Current label names.
    pub fn label_names(&self) -> Vec<String> {
        self.state().labels.iter().map(|l| l.name.clone()).collect()
    }

    /// Note bodies on an issue.
    pub fn note_bodies(&self, iid: u64) -> Vec<String> {
        self.state()
            .notes
            .get(&iid)
            .map(|notes| notes.iter().map(|n| n.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Issue numbers linked to `iid`.
    pub fn linked(&self, iid: u64) -> Vec<u64> {
        self.state()
            .links
            .get(&iid)
            .map(|links| links.iter().map(|l| l.iid).collect())
            .unwrap_or_default()
    }

    fn begin(&self, call: TrackerCall) -> TrackerResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        let failure = state
            .failures
            .iter()
            .find(|(matcher, _)| matcher(&call))
            .map(|(_, error)| error.clone());
        state.calls.push(call);
        match failure {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl MockState {
    fn link(&mut self, a: u64, b: u64) {
        for (from, to) in [(a, b), (b, a)] {
            self.links.entry(from).or_default().push(LinkedIssue { iid: to });
        }
    }

    fn add_note(&mut self, iid: u64, body: &str) -> Note {
        self.next_note_id += 1;
        let note = Note {
            id: self.next_note_id,
            body: body.to_string(),
        };
        self.notes.entry(iid).or_default().push(note.clone());
        note
    }

    fn issue(&self, iid: u64) -> TrackerResult<&Issue> {
        self.issues
            .get(&iid)
            .ok_or_else(|| TrackerError::NotFound(format!("issue #{iid}")))
    }
}

#[async_trait]
impl Tracker for MockTracker {
    async fn list_issues(&self) -> TrackerResult<Vec<Issue>> {
        let state = self.begin(TrackerCall::ListIssues)?;
        Ok(state.issues.values().cloned().collect())
    }

    async fn get_issue(&self, iid: u64) -> TrackerResult<Issue> {
        let state = self.begin(TrackerCall::GetIssue(iid))?;
        state.issue(iid).cloned()
    }

    async fn list_issue_links(&self, iid: u64) -> TrackerResult<Vec<LinkedIssue>> {
        let state = self.begin(TrackerCall::ListIssueLinks(iid))?;
        state.issue(iid)?;
        Ok(state.links.get(&iid).cloned().unwrap_or_default())
    }

    async fn list_issue_notes(&self, iid: u64) -> TrackerResult<Vec<Note>> {
        let state = self.begin(TrackerCall::ListIssueNotes(iid))?;
        state.issue(iid)?;
        Ok(state.notes.get(&iid).cloned().unwrap_or_default())
    }

    async fn list_labels(&self) -> TrackerResult<Vec<Label>> {
        let state = self.begin(TrackerCall::ListLabels)?;
        Ok(state.labels.clone())
    }

    async fn create_label(&self, name: &str, color: &str) -> TrackerResult<Label> {
        let mut state = self.begin(TrackerCall::CreateLabel(name.to_string()))?;
        if state.labels.iter().any(|l| l.name == name) {
            return Err(TrackerError::Conflict(format!("label '{name}' already exists")));
        }
        let label = Label {
            name: name.to_string(),
            color: Some(color.to_string()),
        };
        state.labels.push(label.clone());
        Ok(label)
    }

    async fn delete_label(&self, name: &str) -> TrackerResult<()> {
        let mut state = self.begin(TrackerCall::DeleteLabel(name.to_string()))?;
        let before = state.labels.len();
        state.labels.retain(|l| l.name != name);
        if state.labels.len() == before {
            return Err(TrackerError::NotFound(format!("label '{name}'")));
        }
        Ok(())
    }

    async fn create_issue(&self, issue: &NewIssue) -> TrackerResult<Issue> {
        let mut state = self.begin(TrackerCall::CreateIssue(issue.title.clone()))?;
        let iid = state.issues.keys().next_back().map_or(1, |last| last + 1);
        let now = Utc::now().to_rfc3339();
        let mut created = Issue::new(iid, issue.title.clone())
            .with_labels(issue.labels.iter().cloned())
            .with_description(issue.description.clone())
            .with_updated_at(now.clone());
        created.id = iid + 1000;
        created.created_at = Some(now);
        state.issues.insert(iid, created.clone());
        Ok(created)
    }

    async fn delete_issue(&self, iid: u64) -> TrackerResult<()> {
        let mut state = self.begin(TrackerCall::DeleteIssue(iid))?;
        state.issue(iid)?;
        state.issues.remove(&iid);
        state.notes.remove(&iid);
        state.links.remove(&iid);
        for links in state.links.values_mut() {
            links.retain(|l| l.iid != iid);
        }
        Ok(())
    }

    async fn create_note(&self, iid: u64, body: &str) -> TrackerResult<Note> {
        let mut state = self.begin(TrackerCall::CreateNote {
            iid,
            body: body.to_string(),
        })?;
        state.issue(iid)?;
        Ok(state.add_note(iid, body))
    }

    async fn delete_note(&self, iid: u64, note_id: u64) -> TrackerResult<()> {
        let mut state = self.begin(TrackerCall::DeleteNote { iid, note_id })?;
        state.issue(iid)?;
        let notes = state.notes.entry(iid).or_default();
        let before = notes.len();
        notes.retain(|n| n.id != note_id);
        if notes.len() == before {
            return Err(TrackerError::NotFound(format!("note {note_id} on issue #{iid}")));
        }
        Ok(())
    }

    async fn create_issue_link(
        &self,
        source: u64,
        target: u64,
        _link_type: &str,
    ) -> TrackerResult<()> {
        let mut state = self.begin(TrackerCall::CreateIssueLink { source, target })?;
        state.issue(source)?;
        state.issue(target)?;
        let exists = state
            .links
            .get(&source)
            .is_some_and(|links| links.iter().any(|l| l.iid == target));
        if exists {
            return Err(TrackerError::Conflict(
                "Issue(s) already assigned".to_string(),
            ));
        }
        state.link(source, target);
        Ok(())
    }

    async fn get_board(&self, board_id: u64) -> TrackerResult<Board> {
        let state = self.begin(TrackerCall::GetBoard(board_id))?;
        state
            .boards
            .get(&board_id)
            .map(|(board, _)| board.clone())
            .ok_or_else(|| TrackerError::NotFound(format!("board {board_id}")))
    }

    async fn list_board_lists(&self, board_id: u64) -> TrackerResult<Vec<BoardList>> {
        let state = self.begin(TrackerCall::ListBoardLists(board_id))?;
        state
            .boards
            .get(&board_id)
            .map(|(_, lists)| lists.clone())
            .ok_or_else(|| TrackerError::NotFound(format!("board {board_id}")))
    }

    async fn reorder_issue(&self, iid: u64, after_iid: u64) -> TrackerResult<()> {
        let state = self.begin(TrackerCall::ReorderIssue {
            iid,
            after: after_iid,
        })?;
        state.issue(iid)?;
        state.issue(after_iid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_issue(title: &str) -> NewIssue {
        NewIssue {
            title: title.to_string(),
            description: String::new(),
            labels: vec![],
        }
    }

    #[tokio::test]
    async fn created_issues_get_sequential_numbers() {
        let tracker = MockTracker::new().with_issue(Issue::new(7, "Existing"));

        let a = tracker.create_issue(&new_issue("A")).await.unwrap();
        let b = tracker.create_issue(&new_issue("B")).await.unwrap();

        assert_eq!((a.iid, b.iid), (8, 9));
        assert_eq!(tracker.issues().len(), 3);
    }

    #[tokio::test]
    async fn duplicate_link_is_a_conflict() {
        let tracker = MockTracker::new()
            .with_issue(Issue::new(1, "Epic"))
            .with_issue(Issue::new(2, "Story"))
            .with_link(1, 2);

        let err = tracker
            .create_issue_link(1, 2, super::super::RELATES_TO)
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Conflict(_)));
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_without_effect() {
        let tracker = MockTracker::new();
        tracker.fail_on(
            |call| matches!(call, TrackerCall::CreateLabel(name) if name == "x"),
            TrackerError::Connection("reset".to_string()),
        );

        let err = tracker.create_label("x", "#000000").await.unwrap_err();

        assert_eq!(err, TrackerError::Connection("reset".to_string()));
        assert!(tracker.label_names().is_empty());
        assert_eq!(tracker.calls(), vec![TrackerCall::CreateLabel("x".to_string())]);
    }

    #[tokio::test]
    async fn deleted_note_is_gone_and_cannot_be_deleted_twice() {
        let tracker = MockTracker::new()
            .with_issue(Issue::new(1, "Epic"))
            .with_note(1, "keep me");
        let note = tracker.create_note(1, "/blocked by #2").await.unwrap();

        tracker.delete_note(1, note.id).await.unwrap();

        assert_eq!(tracker.note_bodies(1), vec!["keep me"]);
        assert!(matches!(
            tracker.delete_note(1, note.id).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_issue_drops_its_links() {
        let tracker = MockTracker::new()
            .with_issue(Issue::new(1, "Epic"))
            .with_issue(Issue::new(2, "Story"))
            .with_link(1, 2);

        tracker.delete_issue(2).await.unwrap();

        assert!(tracker.linked(1).is_empty());
        assert!(matches!(
            tracker.get_issue(2).await,
            Err(TrackerError::NotFound(_))
        ));
    }
}
