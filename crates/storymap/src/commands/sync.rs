//! `sync` and `map` commands.

use crate::app::App;
use crate::domain::ProjectMap;
use crate::error::{Error, Result};
use crate::sync::SyncReport;
use crate::tracker::Tracker;
use serde::Serialize;
use tracing::{info, warn};

/// Options of the `sync` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Only report changes; touch neither cache nor map
    pub check: bool,
    /// Rebuild the map even when nothing changed or proposals are pending
    pub force: bool,
}

/// Size of a rebuilt project map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapSummary {
    /// Nodes written
    pub nodes: usize,
    /// Edges written
    pub links: usize,
}

impl From<&ProjectMap> for MapSummary {
    fn from(map: &ProjectMap) -> Self {
        Self {
            nodes: map.nodes.len(),
            links: map.links.len(),
        }
    }
}

/// Result of `storymap sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Changes since the previous sync
    #[serde(flatten)]
    pub report: SyncReport,
    /// Set when the map was rebuilt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapSummary>,
}

/// Detect changes and rebuild the map when something changed, the map is
/// missing, or `force` is set.
///
/// # Errors
///
/// Returns [`Error::PendingProposals`] without touching cache or map when
/// the map holds proposed issues and `force` is not set. Propagates sync and
/// mapping failures.
pub async fn sync(app: &App, tracker: &dyn Tracker, options: SyncOptions) -> Result<SyncOutcome> {
    let engine = app.sync_engine(tracker);
    if options.check {
        return Ok(SyncOutcome {
            report: engine.check().await?,
            map: None,
        });
    }

    let pending = pending_proposals(app).await?;
    if pending > 0 && !options.force {
        return Err(Error::PendingProposals(pending));
    }

    let report = engine.sync().await?;
    let rebuild =
        options.force || !report.is_unchanged() || !app.workspace().map_exists().await;
    let map = if rebuild {
        Some(map(app, tracker).await?)
    } else {
        info!("No remote changes, project map left as is");
        None
    };
    Ok(SyncOutcome { report, map })
}

/// Rebuild the project map unconditionally.
///
/// # Errors
///
/// Propagates mapping failures.
pub async fn map(app: &App, tracker: &dyn Tracker) -> Result<MapSummary> {
    let pending = pending_proposals(app).await?;
    if pending > 0 {
        warn!(count = pending, "Discarding proposed issues that were not uploaded");
    }
    let map = app.mapper(tracker).build().await?;
    Ok(MapSummary::from(&map))
}

async fn pending_proposals(app: &App) -> Result<usize> {
    let map = app.workspace().load_map().await?.value;
    Ok(map.placeholder_nodes().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorymapConfig;
    use crate::domain::{Issue, IssueState, MapNode, NodeId};
    use crate::tracker::{MockTracker, TrackerCall};
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        App::new(dir.path(), StorymapConfig::default())
    }

    fn tracker() -> MockTracker {
        MockTracker::new().with_issue(
            Issue::new(1, "Login")
                .with_labels(["Type::Epic", "Backbone::Auth"])
                .with_updated_at("2024-01-01T00:00:00Z"),
        )
    }

    fn list_calls(tracker: &MockTracker) -> usize {
        tracker
            .calls()
            .iter()
            .filter(|c| matches!(c, TrackerCall::ListIssues))
            .count()
    }

    #[tokio::test]
    async fn first_sync_builds_the_map() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();

        let outcome = sync(&app, &tracker, SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.report.updated_count, 1);
        assert_eq!(outcome.map, Some(MapSummary { nodes: 1, links: 0 }));
        assert!(app.workspace().map_exists().await);
    }

    #[tokio::test]
    async fn unchanged_sync_skips_the_map() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();
        sync(&app, &tracker, SyncOptions::default()).await.unwrap();
        let before = list_calls(&tracker);

        let outcome = sync(&app, &tracker, SyncOptions::default()).await.unwrap();

        assert!(outcome.report.is_unchanged());
        assert!(outcome.map.is_none());
        assert_eq!(list_calls(&tracker), before + 1);
    }

    #[tokio::test]
    async fn force_rebuilds_without_changes() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();
        sync(&app, &tracker, SyncOptions::default()).await.unwrap();

        let outcome = sync(
            &app,
            &tracker,
            SyncOptions {
                force: true,
                ..SyncOptions::default()
            },
        )
        .await
        .unwrap();

        assert!(outcome.map.is_some());
    }

    async fn add_proposal(app: &App) {
        let mut map = app.workspace().load_map().await.unwrap().value;
        map.nodes.push(MapNode {
            id: NodeId::from("NEW_1"),
            title: "Sign in".to_string(),
            state: IssueState::Opened,
            labels: vec!["Type::Story".to_string()],
            web_url: None,
            local_path: None,
            description: None,
        });
        app.workspace().save_map(&map).await.unwrap();
    }

    #[tokio::test]
    async fn pending_proposals_block_sync() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();
        sync(&app, &tracker, SyncOptions::default()).await.unwrap();
        add_proposal(&app).await;
        let before = list_calls(&tracker);

        let err = sync(&app, &tracker, SyncOptions::default()).await.unwrap_err();

        assert!(matches!(err, Error::PendingProposals(1)));
        assert_eq!(list_calls(&tracker), before);
        let map = app.workspace().load_map().await.unwrap().value;
        assert!(map.has_placeholders());
    }

    #[tokio::test]
    async fn force_discards_pending_proposals() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();
        sync(&app, &tracker, SyncOptions::default()).await.unwrap();
        add_proposal(&app).await;

        let outcome = sync(
            &app,
            &tracker,
            SyncOptions {
                force: true,
                ..SyncOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.map, Some(MapSummary { nodes: 1, links: 0 }));
        let map = app.workspace().load_map().await.unwrap().value;
        assert!(!map.has_placeholders());
    }

    #[tokio::test]
    async fn check_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let tracker = tracker();

        let outcome = sync(
            &app,
            &tracker,
            SyncOptions {
                check: true,
                ..SyncOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.report.updated_count, 1);
        assert!(outcome.map.is_none());
        assert!(!app.workspace().map_exists().await);
        assert!(!app.workspace().timestamps_path().exists());
    }
}
