//! Typed relationships between map nodes.

use super::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Kind of relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Source is the container of target
    Contains,
    /// Source must be done before target
    Blocks,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Contains => f.write_str("contains"),
            EdgeType::Blocks => f.write_str("blocks"),
        }
    }
}

/// A directed, typed edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Origin node
    pub source: NodeId,
    /// Destination node
    pub target: NodeId,
    /// Relationship kind
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

impl Edge {
    /// `source` contains `target`.
    pub fn contains(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeType::Contains,
        }
    }

    /// `source` blocks `target`.
    pub fn blocks(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeType::Blocks,
        }
    }

    /// Returns `true` if the edge starts and ends at the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Returns `true` if either endpoint is a placeholder.
    pub fn touches_placeholder(&self) -> bool {
        self.source.is_placeholder() || self.target.is_placeholder()
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.kind, self.target)
    }
}

/// Insertion-ordered set of edges.
///
/// Duplicates (same source, target and type) are dropped and self-loops are
/// rejected, so the set can be serialized directly as the map's link list.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<Edge>,
    seen: HashSet<Edge>,
}

impl EdgeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge, returning `true` if it was added.
    pub fn insert(&mut self, edge: Edge) -> bool {
        if edge.is_self_loop() || self.seen.contains(&edge) {
            return false;
        }
        self.seen.insert(edge.clone());
        self.edges.push(edge);
        true
    }

    /// Returns `true` if the set contains `edge`.
    pub fn contains(&self, edge: &Edge) -> bool {
        self.seen.contains(edge)
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the set has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    /// Consume the set, returning edges in insertion order.
    pub fn into_vec(self) -> Vec<Edge> {
        self.edges
    }
}

impl Extend<Edge> for EdgeSet {
    fn extend<I: IntoIterator<Item = Edge>>(&mut self, iter: I) {
        for edge in iter {
            self.insert(edge);
        }
    }
}

impl FromIterator<Edge> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
