//! Writing an approved plan into the workspace.

use super::{ProposedIssue, ProposedIssueSet};
use crate::domain::{
    Edge, EdgeSet, IssueKind, IssueState, LabelScheme, MapNode, NodeId, ProjectMap,
};
use crate::error::{Error, Result};
use crate::paths::{PathResolver, parent_dir};
use crate::workspace::Workspace;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What materializing a plan changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    /// Placeholder nodes added to the map
    pub nodes_added: usize,
    /// Edges added to the map
    pub links_added: usize,
    /// Titles skipped because they already exist
    pub skipped: Vec<String>,
}

/// Turns proposed issues into placeholder nodes, issue files and edges.
pub struct PlanMaterializer<'a> {
    workspace: &'a Workspace,
    scheme: &'a LabelScheme,
}

/// Directory and id of an epic stories can be nested under.
struct EpicSlot {
    dir: String,
    id: NodeId,
}

impl EpicSlot {
    /// Slot of an epic already in the map, if it has a file.
    fn of_node(node: &MapNode) -> Option<Self> {
        let path = node.local_path.as_deref()?;
        Some(Self {
            dir: parent_dir(path).to_string(),
            id: node.id.clone(),
        })
    }
}

/// What each id a plan can mention refers to once existing titles are
/// skipped.
struct KnownIds {
    /// Plan ids whose title is already in the map, with that node's id
    existing: HashMap<String, NodeId>,
    /// Placeholders that will have a node: new plan entries and pending map
    /// nodes
    placeholders: HashSet<String>,
}

impl KnownIds {
    fn new(map: &ProjectMap, plan: &ProposedIssueSet) -> Self {
        let mut existing = HashMap::new();
        let mut placeholders: HashSet<String> = map
            .placeholder_nodes()
            .filter_map(|n| n.id.as_placeholder())
            .map(str::to_string)
            .collect();
        for issue in &plan.proposed_issues {
            match map.nodes.iter().find(|n| n.title == issue.title) {
                Some(node) => {
                    existing.insert(issue.id.clone(), node.id.clone());
                }
                None => {
                    placeholders.insert(issue.id.clone());
                }
            }
        }
        Self {
            existing,
            placeholders,
        }
    }

    fn existing(&self, plan_id: &str) -> Option<&NodeId> {
        self.existing.get(plan_id)
    }

    /// Node an edge endpoint stands for, `None` for a placeholder that will
    /// never have a node.
    fn endpoint(&self, id: &NodeId) -> Option<NodeId> {
        match id {
            NodeId::Remote(_) => Some(id.clone()),
            NodeId::Placeholder(tag) => self
                .existing
                .get(tag)
                .cloned()
                .or_else(|| self.placeholders.contains(tag).then(|| id.clone())),
        }
    }
}

impl<'a> PlanMaterializer<'a> {
    /// Materializer writing into `workspace`.
    pub fn new(workspace: &'a Workspace, scheme: &'a LabelScheme) -> Self {
        Self { workspace, scheme }
    }

    /// Add the plan to the project map and write one file per new issue.
    ///
    /// Issues whose title is already in the map are skipped, and references
    /// to them point at the existing node instead. Dependencies on a
    /// placeholder that is neither in the plan nor in the map are dropped.
    /// When nothing is left to add the map is not rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPlan`] before writing anything if a proposed id
    /// is an issue number, repeats within the plan, or is already used by a
    /// placeholder in the map.
    pub async fn apply(&self, plan: &ProposedIssueSet) -> Result<MaterializeReport> {
        let mut map = self.workspace.load_map().await?.value;
        check_ids(&map, plan)?;

        let known = KnownIds::new(&map, plan);
        let resolver = PathResolver::new(self.scheme);
        let proposed_epics = self.index_proposed_epics(plan, &known, &map, resolver);

        let mut report = MaterializeReport::default();
        let mut nodes = Vec::new();
        let mut edges: EdgeSet = map.links.iter().cloned().collect();
        let links_before = edges.len();

        for issue in &plan.proposed_issues {
            if let Some(existing) = known.existing(&issue.id) {
                warn!(title = %issue.title, existing = %existing, "Issue already exists, skipping");
                report.skipped.push(issue.title.clone());
                continue;
            }
            let id = NodeId::Placeholder(issue.id.clone());

            let parent = self.parent_epic(issue, &proposed_epics, &map);
            let path = match parent {
                Some(slot) => {
                    edges.insert(Edge::contains(slot.id.clone(), id.clone()));
                    resolver.child_path(&slot.dir, &issue.title)
                }
                None => resolver
                    .resolve(&issue.title, &issue.labels)
                    .unwrap_or_else(|| resolver.unassigned_path(&issue.title)),
            };

            self.workspace
                .write_proposed_file(&path, &id, &issue.title, &issue.labels, &issue.description)
                .await?;
            debug!(id = %id, path = %path, "Wrote proposed issue file");

            if let Some(deps) = &issue.dependencies {
                for target in &deps.blocks {
                    match known.endpoint(target) {
                        Some(target) => {
                            edges.insert(Edge::blocks(id.clone(), target));
                        }
                        None => warn!(id = %id, unknown = %target, "Dropping dependency on unknown issue"),
                    }
                }
                for blocker in &deps.is_blocked_by {
                    match known.endpoint(blocker) {
                        Some(blocker) => {
                            edges.insert(Edge::blocks(blocker, id.clone()));
                        }
                        None => warn!(id = %id, unknown = %blocker, "Dropping dependency on unknown issue"),
                    }
                }
            }

            nodes.push(MapNode {
                id,
                title: issue.title.clone(),
                state: IssueState::Opened,
                labels: issue.labels.clone(),
                web_url: None,
                local_path: Some(path),
                description: Some(issue.description.clone()).filter(|d| !d.is_empty()),
            });
        }

        if nodes.is_empty() {
            info!("Every proposed issue already exists, project map unchanged");
            return Ok(report);
        }

        report.nodes_added = nodes.len();
        report.links_added = edges.len() - links_before;
        map.nodes.extend(nodes);
        map.links = edges.into_vec();
        self.workspace.save_map(&map).await?;
        info!(
            nodes = report.nodes_added,
            links = report.links_added,
            "Plan written to project map"
        );
        Ok(report)
    }

    /// Epics named by the plan, keyed by their `Epic::` reference label.
    ///
    /// An epic whose title is already in the map stands for that node.
    fn index_proposed_epics(
        &self,
        plan: &ProposedIssueSet,
        known: &KnownIds,
        map: &ProjectMap,
        resolver: PathResolver<'_>,
    ) -> HashMap<String, EpicSlot> {
        let mut epics = HashMap::new();
        for issue in &plan.proposed_issues {
            if self.scheme.kind(&issue.labels) != IssueKind::Epic {
                continue;
            }
            let Some(label) = self.scheme.epic_reference_label(&issue.labels) else {
                continue;
            };
            let slot = match known.existing(&issue.id) {
                Some(existing) => map
                    .node(existing)
                    .filter(|n| self.scheme.kind(&n.labels) == IssueKind::Epic)
                    .and_then(EpicSlot::of_node),
                None => resolver
                    .resolve(&issue.title, &issue.labels)
                    .map(|path| EpicSlot {
                        dir: parent_dir(&path).to_string(),
                        id: NodeId::Placeholder(issue.id.clone()),
                    }),
            };
            if let Some(slot) = slot {
                epics.entry(label.to_string()).or_insert(slot);
            }
        }
        epics
    }

    /// Epic a proposed story belongs to: an epic of the plan with the same
    /// reference label, else an epic in the map with the referenced title.
    fn parent_epic(
        &self,
        issue: &ProposedIssue,
        proposed: &HashMap<String, EpicSlot>,
        map: &ProjectMap,
    ) -> Option<EpicSlot> {
        if self.scheme.kind(&issue.labels) != IssueKind::Story {
            return None;
        }
        let label = self.scheme.epic_reference_label(&issue.labels)?;
        if let Some(slot) = proposed.get(label) {
            return Some(EpicSlot {
                dir: slot.dir.clone(),
                id: slot.id.clone(),
            });
        }

        let title = self.scheme.epic_references(&issue.labels).next()?.to_lowercase();
        map.nodes
            .iter()
            .filter(|n| self.scheme.kind(&n.labels) == IssueKind::Epic)
            .find(|n| n.title.to_lowercase() == title)
            .and_then(EpicSlot::of_node)
    }
}

fn check_ids(map: &ProjectMap, plan: &ProposedIssueSet) -> Result<()> {
    let taken: HashSet<&str> = map
        .placeholder_nodes()
        .filter_map(|n| n.id.as_placeholder())
        .collect();
    let mut seen = HashSet::new();
    for issue in &plan.proposed_issues {
        let id = issue.id.as_str();
        if !NodeId::parse(id).is_placeholder() {
            return Err(Error::InvalidPlan(format!(
                "proposed id '{id}' looks like an issue number"
            )));
        }
        if !seen.insert(id) {
            return Err(Error::InvalidPlan(format!("proposed id '{id}' is used twice")));
        }
        if taken.contains(id) {
            return Err(Error::InvalidPlan(format!(
                "proposed id '{id}' is already used in the project map"
            )));
        }
    }
    Ok(())
}
