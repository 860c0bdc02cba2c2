//! Domain types for the story map.
//!
//! Remote tracker objects are mapped into the plain value types defined here
//! at the tracker boundary, so the engine never depends on wire formats.

mod edge;
mod labels;
mod project_map;

pub use edge::{Edge, EdgeSet, EdgeType};
pub use labels::{IssueKind, LabelColors, LabelScheme};
pub use project_map::{ExistingIssue, MapNode, MapViolation, ProjectMap};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in the project map.
///
/// Real issues are addressed by their project-scoped number (`iid`); issues
/// that only exist locally carry a placeholder tag such as `NEW_1` until they
/// are uploaded. Serialized untagged: integers are remote ids, strings are
/// placeholders (numeric strings and `#12` style references are read back as
/// remote ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawNodeId", into = "RawNodeId")]
pub enum NodeId {
    /// An issue that exists in the tracker.
    Remote(u64),
    /// A temporary tag for an issue that has not been created yet.
    Placeholder(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Number(u64),
    Text(String),
}

impl NodeId {
    /// Interpret a textual id: digits (optionally prefixed with `#`) are
    /// remote ids, anything else is a placeholder.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        match digits.parse::<u64>() {
            Ok(n) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                NodeId::Remote(n)
            }
            _ => NodeId::Placeholder(trimmed.to_string()),
        }
    }

    /// Returns the remote id, if this node exists in the tracker.
    pub fn as_remote(&self) -> Option<u64> {
        match self {
            NodeId::Remote(iid) => Some(*iid),
            NodeId::Placeholder(_) => None,
        }
    }

    /// Returns the placeholder tag, if this node has not been uploaded.
    pub fn as_placeholder(&self) -> Option<&str> {
        match self {
            NodeId::Remote(_) => None,
            NodeId::Placeholder(tag) => Some(tag),
        }
    }

    /// Returns `true` for placeholder ids.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, NodeId::Placeholder(_))
    }
}

impl From<RawNodeId> for NodeId {
    fn from(raw: RawNodeId) -> Self {
        match raw {
            RawNodeId::Number(n) => NodeId::Remote(n),
            RawNodeId::Text(s) => NodeId::parse(&s),
        }
    }
}

impl From<NodeId> for RawNodeId {
    fn from(id: NodeId) -> Self {
        match id {
            NodeId::Remote(n) => RawNodeId::Number(n),
            NodeId::Placeholder(s) => RawNodeId::Text(s),
        }
    }
}

impl From<u64> for NodeId {
    fn from(iid: u64) -> Self {
        NodeId::Remote(iid)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::parse(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Remote(iid) => write!(f, "{iid}"),
            NodeId::Placeholder(tag) => f.write_str(tag),
        }
    }
}

/// State of an issue in the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Issue is open
    #[default]
    Opened,

    /// Issue has been closed
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Opened => f.write_str("opened"),
            IssueState::Closed => f.write_str("closed"),
        }
    }
}

/// An issue as read from the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Instance-wide id (used by board reordering)
    pub id: u64,

    /// Project-scoped issue number
    pub iid: u64,

    /// Issue title
    pub title: String,

    /// Current state
    pub state: IssueState,

    /// Labels, some namespaced as `Prefix::Value`
    pub labels: Vec<String>,

    /// Description, may embed relationship directives
    pub description: Option<String>,

    /// Link to the issue in the tracker UI
    pub web_url: Option<String>,

    /// Creation timestamp (ISO 8601)
    pub created_at: Option<String>,

    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl Issue {
    /// Create an open issue with the given number and title.
    ///
    /// The instance-wide id defaults to the issue number.
    pub fn new(iid: u64, title: impl Into<String>) -> Self {
        Self {
            id: iid,
            iid,
            title: title.into(),
            state: IssueState::Opened,
            labels: Vec::new(),
            description: None,
            web_url: None,
            created_at: None,
            updated_at: String::new(),
        }
    }

    /// Set the labels.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the last update timestamp.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = updated_at.into();
        self
    }

    /// The map node id of this issue.
    pub fn node_id(&self) -> NodeId {
        NodeId::Remote(self.iid)
    }
}

/// A project label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Hex color, if the tracker reported one
    pub color: Option<String>,
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Note id
    pub id: u64,
    /// Note body
    pub body: String,
}

/// An issue linked to another issue, as returned by the links endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedIssue {
    /// Project-scoped number of the linked issue
    pub iid: u64,
}

/// An issue board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Board id
    pub id: u64,
    /// Board name
    pub name: String,
}

/// A column on an issue board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardList {
    /// List id
    pub id: u64,
    /// Name of the label the list filters on, if any
    pub label: Option<String>,
}

/// Data for creating a new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Issue title
    pub title: String,
    /// Issue description
    pub description: String,
    /// Labels to apply
    pub labels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::digits("12", NodeId::Remote(12))]
    #[case::hash_reference("#12", NodeId::Remote(12))]
    #[case::padded(" 7 ", NodeId::Remote(7))]
    #[case::placeholder("NEW_1", NodeId::Placeholder("NEW_1".to_string()))]
    #[case::signed("+3", NodeId::Placeholder("+3".to_string()))]
    #[case::bare_hash("#", NodeId::Placeholder("#".to_string()))]
    fn parse_node_id(#[case] input: &str, #[case] expected: NodeId) {
        assert_eq!(NodeId::parse(input), expected);
    }

    #[test]
    fn node_id_serializes_untagged() {
        let ids = vec![NodeId::Remote(5), NodeId::Placeholder("NEW_2".to_string())];
        let yaml = serde_yaml::to_string(&ids).unwrap();
        assert_eq!(yaml, "- 5\n- NEW_2\n");

        let back: Vec<NodeId> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, ids);
    }

    #[test]
    fn quoted_number_deserializes_as_remote() {
        let id: NodeId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(id, NodeId::Remote(42));
    }

    #[test]
    fn issue_state_uses_tracker_spelling() {
        assert_eq!(
            serde_json::to_string(&IssueState::Opened).unwrap(),
            "\"opened\""
        );
        assert_eq!(IssueState::Closed.to_string(), "closed");
    }
}
