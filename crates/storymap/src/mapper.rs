//! Full remote → local projection.
//!
//! The build runs in three passes over one issue listing:
//!
//! 1. Every issue that is not a story is placed with [`PathResolver`]. Epics
//!    are recorded in a [`ContainerIndex`] keyed by issue number.
//! 2. Stories are placed inside the directory of their parent epic, found
//!    through structural links (or the legacy `Epic::<title>` label), with a
//!    `contains` edge. Unparented stories keep the resolver's default path.
//! 3. Text directives in descriptions and notes of every issue, tasks
//!    included, become `blocks` edges.
//!
//! The project map is written last, so a failed listing leaves the previous
//! map untouched.

use crate::domain::{
    Edge, EdgeSet, Issue, IssueKind, LabelScheme, MapNode, NodeId, ProjectMap,
};
use crate::error::Result;
use crate::paths::{PathResolver, parent_dir};
use crate::relations::{extract_link_edge, extract_text_edges};
use crate::tracker::Tracker;
use crate::workspace::Workspace;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Epics placed in pass 1, read-only during pass 2.
#[derive(Debug, Default)]
struct ContainerIndex {
    dirs: HashMap<u64, String>,
    by_title: HashMap<String, u64>,
}

impl ContainerIndex {
    fn insert(&mut self, iid: u64, dir: &str, title: &str) {
        // First epic wins on duplicate titles, matching listing order.
        self.by_title.entry(title.to_lowercase()).or_insert(iid);
        self.dirs.insert(iid, dir.to_string());
    }

    fn contains(&self, iid: u64) -> bool {
        self.dirs.contains_key(&iid)
    }

    fn dir(&self, iid: u64) -> Option<&str> {
        self.dirs.get(&iid).map(String::as_str)
    }

    fn find_by_title(&self, title: &str) -> Option<u64> {
        self.by_title.get(&title.to_lowercase()).copied()
    }
}

/// Rebuilds the project map and the issue tree from the tracker.
pub struct ProjectMapper<'a> {
    tracker: &'a dyn Tracker,
    workspace: &'a Workspace,
    scheme: &'a LabelScheme,
}

impl<'a> ProjectMapper<'a> {
    /// Create a mapper over the given tracker and workspace.
    pub fn new(tracker: &'a dyn Tracker, workspace: &'a Workspace, scheme: &'a LabelScheme) -> Self {
        Self {
            tracker,
            workspace,
            scheme,
        }
    }

    /// Fetch every issue, write the issue files and persist the map.
    ///
    /// # Errors
    ///
    /// Fails without touching the map if the issue listing fails or a file
    /// cannot be written. Link and note fetch failures only drop the
    /// relationships of the affected issue.
    pub async fn build(&self) -> Result<ProjectMap> {
        let issues = self.tracker.list_issues().await?;
        info!(count = issues.len(), "Fetched issues for mapping");

        let resolver = PathResolver::new(self.scheme);
        let mut nodes = Vec::with_capacity(issues.len());
        let mut edges = EdgeSet::new();

        let index = self.place_containers(&issues, resolver, &mut nodes).await?;
        self.place_stories(&issues, resolver, &index, &mut nodes, &mut edges)
            .await?;
        self.collect_text_edges(&issues, &mut edges).await;

        let map = ProjectMap {
            nodes,
            links: edges.into_vec(),
        };
        self.workspace.save_map(&map).await?;
        info!(
            nodes = map.nodes.len(),
            links = map.links.len(),
            "Project map rebuilt"
        );
        Ok(map)
    }

    async fn place_containers(
        &self,
        issues: &[Issue],
        resolver: PathResolver<'_>,
        nodes: &mut Vec<MapNode>,
    ) -> Result<ContainerIndex> {
        let mut index = ContainerIndex::default();
        for issue in issues {
            let kind = self.scheme.kind(&issue.labels);
            if kind == IssueKind::Story {
                continue;
            }
            let Some(path) = resolver.resolve(&issue.title, &issue.labels) else {
                debug!(iid = issue.iid, "No file for task");
                continue;
            };
            if kind == IssueKind::Epic {
                index.insert(issue.iid, parent_dir(&path), &issue.title);
            }
            self.place(issue, path, nodes).await?;
        }
        Ok(index)
    }

    async fn place_stories(
        &self,
        issues: &[Issue],
        resolver: PathResolver<'_>,
        index: &ContainerIndex,
        nodes: &mut Vec<MapNode>,
        edges: &mut EdgeSet,
    ) -> Result<()> {
        for issue in issues {
            if self.scheme.kind(&issue.labels) != IssueKind::Story {
                continue;
            }
            let nested = self.find_parent(issue, index).await.and_then(|edge| {
                let dir = edge.source.as_remote().and_then(|epic| index.dir(epic))?;
                Some((resolver.child_path(dir, &issue.title), edge))
            });
            let path = if let Some((path, edge)) = nested {
                edges.insert(edge);
                path
            } else if let Some(path) = resolver.resolve(&issue.title, &issue.labels) {
                path
            } else {
                continue;
            };
            self.place(issue, path, nodes).await?;
        }
        Ok(())
    }

    /// Parent epic of a story as a `contains` edge.
    ///
    /// Structural links win; the legacy `Epic::<title>` label is only
    /// consulted when no linked issue is a known epic.
    async fn find_parent(&self, issue: &Issue, index: &ContainerIndex) -> Option<Edge> {
        let child = issue.node_id();
        match self.tracker.list_issue_links(issue.iid).await {
            Ok(links) => {
                let linked: Vec<u64> = links.iter().map(|l| l.iid).collect();
                if let Some(edge) = extract_link_edge(&child, &linked, |iid| index.contains(iid)) {
                    return Some(edge);
                }
            }
            Err(e) => {
                warn!(iid = issue.iid, error = %e, "Could not fetch issue links, treating as unlinked");
            }
        }

        let epic = self
            .scheme
            .epic_references(&issue.labels)
            .find_map(|title| index.find_by_title(title))?;
        debug!(iid = issue.iid, epic, "Parent found through epic reference label");
        Some(Edge::contains(epic, child))
    }

    async fn collect_text_edges(&self, issues: &[Issue], edges: &mut EdgeSet) {
        for issue in issues {
            let source = issue.node_id();
            if let Some(description) = &issue.description {
                edges.extend(extract_text_edges(&source, description));
            }
            match self.tracker.list_issue_notes(issue.iid).await {
                Ok(notes) => {
                    for note in &notes {
                        edges.extend(extract_text_edges(&source, &note.body));
                    }
                }
                Err(e) => {
                    warn!(iid = issue.iid, error = %e, "Could not fetch issue notes, skipping their directives");
                }
            }
        }
    }

    async fn place(&self, issue: &Issue, path: String, nodes: &mut Vec<MapNode>) -> Result<()> {
        self.workspace.write_issue_file(&path, issue).await?;
        debug!(iid = issue.iid, path = %path, "Wrote issue file");
        nodes.push(MapNode {
            id: NodeId::Remote(issue.iid),
            title: issue.title.clone(),
            state: issue.state,
            labels: issue.labels.clone(),
            web_url: issue.web_url.clone(),
            local_path: Some(path),
            description: None,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::domain::EdgeType;
    use crate::tracker::{MockTracker, TrackerCall, TrackerError};
    use tempfile::TempDir;

    fn epic(iid: u64, title: &str, backbone: &str) -> Issue {
        Issue::new(iid, title).with_labels(["Type::Epic".to_string(), format!("Backbone::{backbone}")])
    }

    fn story(iid: u64, title: &str, backbone: &str) -> Issue {
        Issue::new(iid, title).with_labels(["Type::Story".to_string(), format!("Backbone::{backbone}")])
    }

    fn path_of(map: &ProjectMap, iid: u64) -> Option<&str> {
        map.node(&NodeId::Remote(iid))
            .and_then(|n| n.local_path.as_deref())
    }

    async fn build(tracker: &MockTracker, dir: &TempDir) -> Result<ProjectMap> {
        let workspace = Workspace::new(dir.path(), &PathsConfig::default());
        let scheme = LabelScheme::default();
        ProjectMapper::new(tracker, &workspace, &scheme).build().await
    }

    #[tokio::test]
    async fn linked_story_is_nested_under_its_epic() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new()
            .with_issue(epic(1, "Implement Login Feature", "User Authentication"))
            .with_issue(story(2, "Sign in with email", "User Authentication"))
            .with_link(1, 2);

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(
            path_of(&map, 1),
            Some("backbones/user-authentication/implement-login-feature/epic.md")
        );
        assert_eq!(
            path_of(&map, 2),
            Some("backbones/user-authentication/implement-login-feature/story-sign-in-with-email.md")
        );
        let contains: Vec<_> = map
            .links
            .iter()
            .filter(|e| e.kind == EdgeType::Contains)
            .collect();
        assert_eq!(contains, vec![&Edge::contains(1_u64, 2_u64)]);
        assert!(
            dir.path()
                .join("gitlab_data/backbones/user-authentication/implement-login-feature/story-sign-in-with-email.md")
                .is_file()
        );
    }

    #[tokio::test]
    async fn unlinked_story_keeps_backbone_path() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new().with_issue(story(4, "Reset password", "Auth"));

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(path_of(&map, 4), Some("backbones/auth/story-reset-password.md"));
        assert!(map.links.is_empty());
    }

    #[tokio::test]
    async fn story_linked_to_non_epic_is_not_nested() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new()
            .with_issue(story(1, "First", "Auth"))
            .with_issue(story(2, "Second", "Auth"))
            .with_link(1, 2);

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(path_of(&map, 2), Some("backbones/auth/story-second.md"));
        assert!(map.links.is_empty());
    }

    #[tokio::test]
    async fn epic_reference_label_is_a_fallback() {
        let dir = TempDir::new().unwrap();
        let legacy = Issue::new(3, "Remember me").with_labels([
            "Type::Story",
            "Backbone::Auth",
            "Epic::login flow",
        ]);
        let tracker = MockTracker::new()
            .with_issue(epic(1, "Login Flow", "Auth"))
            .with_issue(legacy);

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(
            path_of(&map, 3),
            Some("backbones/auth/login-flow/story-remember-me.md")
        );
        assert!(map.links.contains(&Edge::contains(1_u64, 3_u64)));
    }

    #[tokio::test]
    async fn structural_link_beats_epic_reference_label() {
        let dir = TempDir::new().unwrap();
        let s = Issue::new(3, "Remember me").with_labels([
            "Type::Story",
            "Backbone::Auth",
            "Epic::Login Flow",
        ]);
        let tracker = MockTracker::new()
            .with_issue(epic(1, "Login Flow", "Auth"))
            .with_issue(epic(2, "Sessions", "Auth"))
            .with_issue(s)
            .with_link(2, 3);

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(path_of(&map, 3), Some("backbones/auth/sessions/story-remember-me.md"));
        assert!(map.links.contains(&Edge::contains(2_u64, 3_u64)));
        assert!(!map.links.contains(&Edge::contains(1_u64, 3_u64)));
    }

    #[tokio::test]
    async fn directives_in_description_and_notes_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new()
            .with_issue(story(1, "A", "X").with_description("Needs work /blocking #5"))
            .with_issue(story(5, "B", "X"))
            .with_note(1, "> quoted: /blocking #5\n/blocked by #7");

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(
            map.links,
            vec![Edge::blocks(1_u64, 5_u64), Edge::blocks(7_u64, 1_u64)]
        );
    }

    #[tokio::test]
    async fn tasks_have_no_file_but_contribute_edges() {
        let dir = TempDir::new().unwrap();
        let task = Issue::new(9, "Wire DB")
            .with_labels(["Type::Task"])
            .with_description("/blocking #1");
        let tracker = MockTracker::new()
            .with_issue(story(1, "A", "X"))
            .with_issue(task);

        let map = build(&tracker, &dir).await.unwrap();

        assert!(map.node(&NodeId::Remote(9)).is_none());
        assert_eq!(map.links, vec![Edge::blocks(9_u64, 1_u64)]);
    }

    #[tokio::test]
    async fn auxiliary_fetch_failures_degrade_gracefully() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new()
            .with_issue(epic(1, "E", "X"))
            .with_issue(story(2, "S", "X"))
            .with_link(1, 2)
            .with_note(1, "/blocking #2");
        tracker.fail_on(
            |c| matches!(c, TrackerCall::ListIssueLinks(_) | TrackerCall::ListIssueNotes(_)),
            TrackerError::Connection("reset".to_string()),
        );

        let map = build(&tracker, &dir).await.unwrap();

        assert_eq!(path_of(&map, 2), Some("backbones/x/story-s.md"));
        assert!(map.links.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_keeps_previous_map() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path(), &PathsConfig::default());
        let previous = ProjectMap {
            nodes: Vec::new(),
            links: vec![Edge::blocks(1_u64, 2_u64)],
        };
        workspace.save_map(&previous).await.unwrap();
        let tracker = MockTracker::new().with_issue(epic(1, "E", "X"));
        tracker.fail_on(
            |c| matches!(c, TrackerCall::ListIssues),
            TrackerError::Unauthorized("401".to_string()),
        );

        let result = build(&tracker, &dir).await;

        assert!(result.is_err());
        assert_eq!(workspace.load_map().await.unwrap().value, previous);
    }

    #[tokio::test]
    async fn rebuild_from_unchanged_data_is_identical() {
        let dir = TempDir::new().unwrap();
        let tracker = MockTracker::new()
            .with_issue(epic(1, "Implement Login Feature", "User Authentication"))
            .with_issue(story(2, "Sign in", "User Authentication"))
            .with_issue(story(3, "Héllo, Wörld!", "Other"))
            .with_link(1, 2);
        let workspace = Workspace::new(dir.path(), &PathsConfig::default());

        let first = build(&tracker, &dir).await.unwrap();
        let first_bytes = tokio::fs::read(workspace.map_path()).await.unwrap();
        let second = build(&tracker, &dir).await.unwrap();
        let second_bytes = tokio::fs::read(workspace.map_path()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(path_of(&second, 3), Some("backbones/other/story-hello-world.md"));
    }
}
