//! Promotion of locally proposed issues to the tracker.
//!
//! An upload takes every placeholder node of the project map and runs these
//! stages in order:
//!
//! 1. create the missing labels
//! 2. create the issues, mapping each placeholder to its issue number
//! 3. realize `blocks` edges as `/blocked by #N` notes on the blocked issue
//! 4. realize `contains` edges as native issue links (409 counts as done)
//! 5. rewrite placeholders in the map and save it
//! 6. reorder new stories after their epic on the configured board
//!
//! A failure in stages 1-4 deletes every created note, issue and label
//! through the [`UndoLog`] and reports [`Error::UploadAborted`]. Stage 6 only
//! warns.

mod undo;

pub use undo::{RollbackOutcome, UndoAction, UndoLog};

use crate::domain::{
    BoardList, EdgeType, IssueKind, LabelScheme, MapNode, NewIssue, NodeId, ProjectMap,
};
use crate::error::{Error, Result};
use crate::relations::blocked_by_directive;
use crate::tracker::{RELATES_TO, Tracker, TrackerError, TrackerResult};
use crate::workspace::Workspace;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counts of what an upload created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    /// Labels created
    pub labels_created: usize,
    /// Issues created
    pub issues_created: usize,
    /// Native issue links created
    pub links_created: usize,
    /// Dependency notes created
    pub notes_created: usize,
    /// New stories moved after their epic on the board
    pub issues_reordered: usize,
    /// Placeholder → issue number
    pub id_map: BTreeMap<String, u64>,
}

/// One upload run over the project map in a workspace.
pub struct UploadTransaction<'a> {
    tracker: &'a dyn Tracker,
    workspace: &'a Workspace,
    scheme: &'a LabelScheme,
    board_id: Option<u64>,
    throttle: Duration,
}

/// State accumulated by stages 1-4.
#[derive(Default)]
struct Progress {
    log: UndoLog,
    ids: HashMap<String, u64>,
    report: UploadReport,
}

impl<'a> UploadTransaction<'a> {
    /// Create a transaction with no board and no throttling.
    pub fn new(tracker: &'a dyn Tracker, workspace: &'a Workspace, scheme: &'a LabelScheme) -> Self {
        Self {
            tracker,
            workspace,
            scheme,
            board_id: None,
            throttle: Duration::ZERO,
        }
    }

    /// Reorder new stories on this board after upload.
    #[must_use]
    pub fn with_board(mut self, board_id: Option<u64>) -> Self {
        self.board_id = board_id;
        self
    }

    /// Pause between mutating calls.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Upload the placeholder nodes of the workspace map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMap`] before any remote call if the map breaks
    /// an edge invariant, and [`Error::UploadAborted`] after rolling back if
    /// any creation stage fails.
    pub async fn run(&self) -> Result<UploadReport> {
        let loaded = self.workspace.load_map().await?;
        if loaded.recovered() {
            warn!(path = %self.workspace.map_path().display(), "Project map unreadable, nothing to upload");
        }
        let mut map = loaded.value;

        let violations = map.validate(self.scheme);
        if !violations.is_empty() {
            let described: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(Error::InvalidMap(described.join("; ")));
        }

        let proposed: Vec<MapNode> = map.placeholder_nodes().cloned().collect();
        if proposed.is_empty() {
            info!("No proposed issues to upload");
            return Ok(UploadReport::default());
        }
        info!(count = proposed.len(), "Uploading proposed issues");

        let mut progress = Progress::default();
        if let Err(e) = self.create_all(&map, &proposed, &mut progress).await {
            error!(error = %e, created = progress.log.len(), "Upload failed, rolling back");
            let outcome = progress.log.rollback(self.tracker).await;
            return Err(Error::UploadAborted {
                message: e.to_string(),
                rolled_back: outcome.rolled_back,
                rollback_failures: outcome.failures,
            });
        }

        let rewritten = map.rewrite_placeholders(&progress.ids);
        self.workspace.save_map(&map).await?;
        debug!(rewritten, "Placeholders replaced in project map");

        let mut report = progress.report;
        report.issues_reordered = self.reorder(&map, &progress.ids).await;
        report.id_map = progress.ids.into_iter().collect();
        info!(
            labels = report.labels_created,
            issues = report.issues_created,
            links = report.links_created,
            notes = report.notes_created,
            "Upload finished"
        );
        Ok(report)
    }

    async fn create_all(
        &self,
        map: &ProjectMap,
        proposed: &[MapNode],
        progress: &mut Progress,
    ) -> TrackerResult<()> {
        self.create_labels(proposed, progress).await?;
        self.create_issues(proposed, progress).await?;
        self.create_blocking_notes(map, progress).await?;
        self.create_containment_links(map, progress).await
    }

    async fn create_labels(&self, proposed: &[MapNode], progress: &mut Progress) -> TrackerResult<()> {
        let existing: HashSet<String> = self
            .tracker
            .list_labels()
            .await?
            .into_iter()
            .map(|l| l.name)
            .collect();

        let mut seen = HashSet::new();
        let missing: Vec<&str> = proposed
            .iter()
            .flat_map(|n| self.remote_labels(n))
            .filter(|label| !existing.contains(*label) && seen.insert(*label))
            .collect();

        for name in missing {
            self.tracker
                .create_label(name, self.scheme.color_for(name))
                .await?;
            debug!(label = %name, "Created label");
            progress.log.record(UndoAction::DeleteLabel(name.to_string()));
            progress.report.labels_created += 1;
            self.pause().await;
        }
        Ok(())
    }

    async fn create_issues(&self, proposed: &[MapNode], progress: &mut Progress) -> TrackerResult<()> {
        for node in proposed {
            let Some(tag) = node.id.as_placeholder() else {
                continue;
            };
            let new_issue = NewIssue {
                title: node.title.clone(),
                description: self.description(node).await,
                labels: self.remote_labels(node).map(str::to_string).collect(),
            };
            let created = self.tracker.create_issue(&new_issue).await?;
            debug!(placeholder = %tag, iid = created.iid, "Created issue");
            progress.log.record(UndoAction::DeleteIssue(created.iid));
            progress.ids.insert(tag.to_string(), created.iid);
            progress.report.issues_created += 1;
            self.pause().await;
        }
        Ok(())
    }

    async fn create_blocking_notes(&self, map: &ProjectMap, progress: &mut Progress) -> TrackerResult<()> {
        for edge in new_edges(map, EdgeType::Blocks) {
            let (Some(source), Some(target)) =
                (resolve(&edge.0, &progress.ids), resolve(&edge.1, &progress.ids))
            else {
                warn!(source = %edge.0, target = %edge.1, "Unresolved blocks edge skipped");
                continue;
            };
            let note = self
                .tracker
                .create_note(target, &blocked_by_directive(source))
                .await?;
            debug!(source, target, note_id = note.id, "Recorded dependency note");
            progress.log.record(UndoAction::DeleteNote {
                iid: target,
                note_id: note.id,
            });
            progress.report.notes_created += 1;
            self.pause().await;
        }
        Ok(())
    }

    async fn create_containment_links(
        &self,
        map: &ProjectMap,
        progress: &mut Progress,
    ) -> TrackerResult<()> {
        for edge in new_edges(map, EdgeType::Contains) {
            let (Some(source), Some(target)) =
                (resolve(&edge.0, &progress.ids), resolve(&edge.1, &progress.ids))
            else {
                warn!(source = %edge.0, target = %edge.1, "Unresolved contains edge skipped");
                continue;
            };
            match self.tracker.create_issue_link(source, target, RELATES_TO).await {
                Ok(()) => {
                    debug!(source, target, "Linked issues");
                    progress.report.links_created += 1;
                    self.pause().await;
                }
                Err(TrackerError::Conflict(_)) => {
                    info!(source, target, "Issues already linked, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Move every new story after its epic in the board list of its
    /// backbone. Returns the number of moved issues.
    async fn reorder(&self, map: &ProjectMap, ids: &HashMap<String, u64>) -> usize {
        let Some(board_id) = self.board_id else {
            return 0;
        };
        let lists = match self.board_lists(board_id).await {
            Ok(lists) => lists,
            Err(e) => {
                warn!(board_id, error = %e, "Could not load board, skipping reorder");
                return 0;
            }
        };

        let created: HashSet<u64> = ids.values().copied().collect();
        let mut moved = 0;
        for edge in map.links.iter().filter(|e| e.kind == EdgeType::Contains) {
            let (Some(parent), Some(child)) = (edge.source.as_remote(), edge.target.as_remote())
            else {
                continue;
            };
            if !created.contains(&child) {
                continue;
            }
            let Some(node) = map.node(&edge.target) else {
                continue;
            };
            if self.scheme.kind(&node.labels) != IssueKind::Story {
                continue;
            }
            if !lists.iter().any(|list| self.list_matches(list, node)) {
                debug!(iid = child, "No board list for story backbone");
                continue;
            }
            match self.tracker.reorder_issue(child, parent).await {
                Ok(()) => moved += 1,
                Err(e) => warn!(iid = child, parent, error = %e, "Could not reorder issue"),
            }
        }
        moved
    }

    async fn board_lists(&self, board_id: u64) -> TrackerResult<Vec<BoardList>> {
        let board = self.tracker.get_board(board_id).await?;
        debug!(board = %board.name, "Reordering on board");
        self.tracker.list_board_lists(board.id).await
    }

    fn list_matches(&self, list: &BoardList, node: &MapNode) -> bool {
        list.label.as_deref().is_some_and(|label| {
            label.starts_with(&self.scheme.backbone_prefix) && node.labels.iter().any(|l| l == label)
        })
    }

    /// Labels sent to the tracker, without transient epic references.
    fn remote_labels<'n>(&'n self, node: &'n MapNode) -> impl Iterator<Item = &'n str> {
        node.labels
            .iter()
            .map(String::as_str)
            .filter(|l| !self.scheme.is_epic_reference(l))
    }

    /// Description from the issue file, else the inline one, else empty.
    async fn description(&self, node: &MapNode) -> String {
        let from_file = match &node.local_path {
            Some(path) => self.workspace.read_description(path).await,
            None => None,
        };
        from_file
            .or_else(|| node.description.as_ref().map(|d| d.trim().to_string()))
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }
    }
}

/// Endpoints of edges of `kind` that touch at least one placeholder.
fn new_edges(map: &ProjectMap, kind: EdgeType) -> Vec<(NodeId, NodeId)> {
    map.links
        .iter()
        .filter(|e| e.kind == kind && e.touches_placeholder())
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

fn resolve(id: &NodeId, ids: &HashMap<String, u64>) -> Option<u64> {
    match id {
        NodeId::Remote(iid) => Some(*iid),
        NodeId::Placeholder(tag) => ids.get(tag).copied(),
    }
}
