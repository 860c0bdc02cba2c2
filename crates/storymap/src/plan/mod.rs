//! Planning collaborator interface and local plan materialization.
//!
//! A [`Planner`] turns a feature description plus project context into a
//! [`ProposedIssueSet`]. The set is never sent to the tracker directly: it is
//! first materialized as placeholder nodes and issue files, reviewed, and
//! later promoted by an upload.

mod context;
mod file_planner;
mod materialize;
mod sanitizer;

pub use context::gather_context;
pub use file_planner::FilePlanner;
pub use materialize::{MaterializeReport, PlanMaterializer};
pub use sanitizer::Sanitizer;

use crate::domain::{ExistingIssue, NodeId};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Input handed to a planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanRequest {
    /// Feature description written by the user
    pub description: String,
    /// Project documentation and map context
    pub context: String,
    /// Issues that already exist
    pub existing_issues: Vec<ExistingIssue>,
}

/// Dependencies of a proposed issue on other issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Issues this one blocks
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<NodeId>,
    /// Issues blocking this one
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub is_blocked_by: Vec<NodeId>,
}

/// One issue the planner suggests creating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedIssue {
    /// Placeholder id, unique within the plan (e.g. `NEW_1`)
    pub id: String,
    /// Issue title
    pub title: String,
    /// Markdown description
    #[serde(default)]
    pub description: String,
    /// Labels, possibly including an `Epic::<title>` reference
    #[serde(default)]
    pub labels: Vec<String>,
    /// Declared dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
}

/// A complete plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedIssueSet {
    /// Issues to create; empty means nothing new is needed
    #[serde(default)]
    pub proposed_issues: Vec<ProposedIssue>,
}

impl ProposedIssueSet {
    /// Returns `true` if the plan proposes nothing.
    pub fn is_empty(&self) -> bool {
        self.proposed_issues.is_empty()
    }
}

/// Errors from a planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The proposal source could not be read.
    #[error("Failed to read proposal {path}: {source}")]
    Io {
        /// Proposal location
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The proposal is not a valid plan document.
    #[error("Invalid proposal: {0}")]
    Parse(String),
}

/// Source of issue proposals.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Propose issues for `request`.
    ///
    /// `Ok(None)` means no plan is available.
    async fn propose_issues(
        &self,
        request: &PlanRequest,
    ) -> Result<Option<ProposedIssueSet>, PlannerError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(NodeId),
    Many(Vec<NodeId>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
    })
}
