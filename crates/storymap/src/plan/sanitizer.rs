//! Masking of project identifiers in planner traffic.

use super::{PlanRequest, ProposedIssueSet};
use crate::domain::ExistingIssue;

const URL_TOKEN: &str = "[PROJECT_URL]";
const ID_TOKEN: &str = "[PROJECT_ID]";

/// Replaces the tracker URL and project id with fixed tokens before text
/// leaves the process, and puts them back in the planner's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitizer {
    project_url: String,
    project_id: String,
}

impl Sanitizer {
    /// Mask `project_url` and `project_id`; empty values are left alone.
    pub fn new(project_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            project_id: project_id.into(),
        }
    }

    /// Replace identifiers with tokens.
    pub fn anonymize(&self, text: &str) -> String {
        let mut out = text.to_string();
        if !self.project_url.is_empty() {
            out = out.replace(&self.project_url, URL_TOKEN);
        }
        if !self.project_id.is_empty() {
            out = out.replace(&self.project_id, ID_TOKEN);
        }
        out
    }

    /// Replace tokens with identifiers.
    pub fn deanonymize(&self, text: &str) -> String {
        let mut out = text.to_string();
        if !self.project_url.is_empty() {
            out = out.replace(URL_TOKEN, &self.project_url);
        }
        if !self.project_id.is_empty() {
            out = out.replace(ID_TOKEN, &self.project_id);
        }
        out
    }

    /// Masked copy of a request.
    pub fn anonymize_request(&self, request: &PlanRequest) -> PlanRequest {
        PlanRequest {
            description: self.anonymize(&request.description),
            context: self.anonymize(&request.context),
            existing_issues: request
                .existing_issues
                .iter()
                .map(|issue| ExistingIssue {
                    title: self.anonymize(&issue.title),
                    labels: issue.labels.iter().map(|l| self.anonymize(l)).collect(),
                    state: issue.state,
                })
                .collect(),
        }
    }

    /// Restore identifiers in titles, descriptions and labels of a plan.
    pub fn restore(&self, plan: &mut ProposedIssueSet) {
        for issue in &mut plan.proposed_issues {
            issue.title = self.deanonymize(&issue.title);
            issue.description = self.deanonymize(&issue.description);
            for label in &mut issue.labels {
                *label = self.deanonymize(label);
            }
        }
    }
}
