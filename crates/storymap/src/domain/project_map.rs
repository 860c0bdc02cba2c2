//! The persisted node/edge graph.

use super::{Edge, EdgeType, IssueKind, IssueState, LabelScheme, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One issue (real or proposed) in the project map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapNode {
    /// Remote issue number or placeholder tag
    pub id: NodeId,

    /// Issue title
    pub title: String,

    /// Issue state
    #[serde(default)]
    pub state: IssueState,

    /// Labels
    #[serde(default)]
    pub labels: Vec<String>,

    /// Link to the issue in the tracker UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,

    /// Issue file path relative to the data directory, `/`-separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,

    /// Inline description, used when the issue file cannot be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Summary of an issue handed to the planning collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingIssue {
    /// Issue title
    pub title: String,
    /// Labels
    pub labels: Vec<String>,
    /// Issue state
    pub state: IssueState,
}

/// A structural problem in a project map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapViolation {
    /// Edge from a node to itself.
    SelfLoop(Edge),
    /// A `contains` edge that does not go from an epic to a story.
    InvalidContainment {
        /// The offending edge
        edge: Edge,
        /// Kind of the source node
        source: IssueKind,
        /// Kind of the target node
        target: IssueKind,
    },
    /// An edge endpoint naming a placeholder no node carries.
    UnknownPlaceholder {
        /// The offending edge
        edge: Edge,
        /// The placeholder tag
        tag: String,
    },
}

impl fmt::Display for MapViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapViolation::SelfLoop(edge) => write!(f, "self-loop {edge}"),
            MapViolation::InvalidContainment {
                edge,
                source,
                target,
            } => write!(
                f,
                "{edge} links {source} to {target}; contains must go from epic to story"
            ),
            MapViolation::UnknownPlaceholder { edge, tag } => {
                write!(f, "{edge} refers to {tag}, which is not in the map")
            }
        }
    }
}

/// The serialized aggregate of all known issues and their relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMap {
    /// Issues
    #[serde(default)]
    pub nodes: Vec<MapNode>,

    /// Typed edges
    #[serde(default)]
    pub links: Vec<Edge>,
}

impl ProjectMap {
    /// Find a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&MapNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Nodes that have not been uploaded yet, in map order.
    pub fn placeholder_nodes(&self) -> impl Iterator<Item = &MapNode> {
        self.nodes.iter().filter(|n| n.id.is_placeholder())
    }

    /// Returns `true` if any node is a placeholder.
    pub fn has_placeholders(&self) -> bool {
        self.placeholder_nodes().next().is_some()
    }

    /// Summaries of every node, for planning context.
    pub fn summaries(&self) -> Vec<ExistingIssue> {
        self.nodes
            .iter()
            .map(|n| ExistingIssue {
                title: n.title.clone(),
                labels: n.labels.clone(),
                state: n.state,
            })
            .collect()
    }

    /// Check structural invariants.
    ///
    /// Placeholder endpoints must name a node, since only nodes are uploaded.
    /// `contains` edges are only checked when both endpoints are nodes in the
    /// map; edges into issues without a file (tasks) are left alone.
    pub fn validate(&self, scheme: &LabelScheme) -> Vec<MapViolation> {
        let kinds: HashMap<&NodeId, IssueKind> = self
            .nodes
            .iter()
            .map(|n| (&n.id, scheme.kind(&n.labels)))
            .collect();

        let mut violations = Vec::new();
        for edge in &self.links {
            if edge.is_self_loop() {
                violations.push(MapViolation::SelfLoop(edge.clone()));
                continue;
            }
            for endpoint in [&edge.source, &edge.target] {
                if let Some(tag) = endpoint.as_placeholder()
                    && !kinds.contains_key(endpoint)
                {
                    violations.push(MapViolation::UnknownPlaceholder {
                        edge: edge.clone(),
                        tag: tag.to_string(),
                    });
                }
            }
            if edge.kind != EdgeType::Contains {
                continue;
            }
            if let (Some(&source), Some(&target)) =
                (kinds.get(&edge.source), kinds.get(&edge.target))
                && (source != IssueKind::Epic || target != IssueKind::Story)
            {
                violations.push(MapViolation::InvalidContainment {
                    edge: edge.clone(),
                    source,
                    target,
                });
            }
        }
        violations
    }

    /// Replace every resolved placeholder with its real id, in node ids and
    /// edge endpoints. Returns the number of replaced occurrences.
    pub fn rewrite_placeholders(&mut self, resolved: &HashMap<String, u64>) -> usize {
        let rewrite = |id: &mut NodeId| {
            if let Some(&iid) = id.as_placeholder().and_then(|tag| resolved.get(tag)) {
                *id = NodeId::Remote(iid);
                1
            } else {
                0
            }
        };

        let mut count = 0;
        for node in &mut self.nodes {
            count += rewrite(&mut node.id);
        }
        for edge in &mut self.links {
            count += rewrite(&mut edge.source);
            count += rewrite(&mut edge.target);
        }
        count
    }
}
