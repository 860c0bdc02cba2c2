//! Planner backed by a proposal document on disk.

use super::{PlanRequest, Planner, PlannerError, ProposedIssueSet};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a hand-written or externally generated proposal.
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML. A
/// blank document means no plan is available.
#[derive(Debug, Clone)]
pub struct FilePlanner {
    path: PathBuf,
}

impl FilePlanner {
    /// Planner reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Proposal location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}

#[async_trait]
impl Planner for FilePlanner {
    async fn propose_issues(
        &self,
        request: &PlanRequest,
    ) -> Result<Option<ProposedIssueSet>, PlannerError> {
        debug!(
            path = %self.path.display(),
            existing = request.existing_issues.len(),
            "Reading proposal"
        );
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| PlannerError::Io {
                path: self.path.clone(),
                source,
            })?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let plan = if self.is_json() {
            serde_json::from_str(&content).map_err(|e| PlannerError::Parse(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| PlannerError::Parse(e.to_string()))?
        };
        Ok(Some(plan))
    }
}
