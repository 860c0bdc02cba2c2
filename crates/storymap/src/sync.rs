//! Incremental change detection against the timestamp cache.

use crate::domain::Issue;
use crate::error::Result;
use crate::timestamps::TimestampCache;
use crate::tracker::Tracker;
use crate::workspace::Workspace;
use serde::Serialize;
use tracing::{debug, info};

/// An issue that is new or changed since the previous sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedIssue {
    /// Issue number
    pub iid: u64,
    /// Current title
    pub title: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Number of new or changed issues
    pub updated_count: usize,
    /// The new or changed issues, in listing order
    pub updated_issues: Vec<UpdatedIssue>,
    /// Number of issues in the tracker
    pub total_issues: usize,
}

impl SyncReport {
    /// Returns `true` if nothing changed.
    pub fn is_unchanged(&self) -> bool {
        self.updated_count == 0
    }
}

/// Compares the tracker against the last observed timestamps.
pub struct SyncEngine<'a> {
    tracker: &'a dyn Tracker,
    workspace: &'a Workspace,
}

impl<'a> SyncEngine<'a> {
    /// Create an engine over the given tracker and workspace.
    pub fn new(tracker: &'a dyn Tracker, workspace: &'a Workspace) -> Self {
        Self { tracker, workspace }
    }

    /// Report changed issues and replace the cache with current timestamps.
    ///
    /// # Errors
    ///
    /// Any tracker failure aborts the run before the cache is rewritten.
    pub async fn sync(&self) -> Result<SyncReport> {
        let report = self.run(true).await?;
        info!(
            updated = report.updated_count,
            total = report.total_issues,
            "Sync finished"
        );
        Ok(report)
    }

    /// Report changed issues without rewriting the cache.
    ///
    /// # Errors
    ///
    /// Fails if the tracker cannot be queried.
    pub async fn check(&self) -> Result<SyncReport> {
        self.run(false).await
    }

    async fn run(&self, persist: bool) -> Result<SyncReport> {
        let path = self.workspace.timestamps_path();
        let cache = TimestampCache::load(&path).await?;
        let issues = self.tracker.list_issues().await?;

        let stale: Vec<&Issue> = issues.iter().filter(|i| cache.is_stale(i)).collect();
        debug!(cached = cache.len(), stale = stale.len(), "Compared timestamps");

        let mut updated_issues = Vec::with_capacity(stale.len());
        for issue in stale {
            let full = self.tracker.get_issue(issue.iid).await?;
            updated_issues.push(UpdatedIssue {
                iid: full.iid,
                title: full.title,
            });
        }

        if persist {
            TimestampCache::from_issues(&issues).save(&path).await?;
        }

        Ok(SyncReport {
            updated_count: updated_issues.len(),
            updated_issues,
            total_issues: issues.len(),
        })
    }
}
