//! Label conventions used to classify issues.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue classification derived from labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Container of stories
    Epic,
    /// Unit of user-facing work
    Story,
    /// Implementation task, not mapped to a file
    Task,
    /// Anything without a type label
    Other,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::Epic => f.write_str("epic"),
            IssueKind::Story => f.write_str("story"),
            IssueKind::Task => f.write_str("task"),
            IssueKind::Other => f.write_str("other"),
        }
    }
}

/// Colors used when creating missing labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LabelColors {
    /// Color for backbone labels
    pub backbone: String,
    /// Color for the epic type label
    pub epic: String,
    /// Color for the story type label
    pub story: String,
    /// Color for everything else
    pub default: String,
}

impl Default for LabelColors {
    fn default() -> Self {
        Self {
            backbone: "#330066".to_string(),
            epic: "#6699cc".to_string(),
            story: "#eee600".to_string(),
            default: "#F0AD4E".to_string(),
        }
    }
}

/// Label naming scheme.
///
/// Backbones are encoded as `<backbone-prefix><name>` (e.g. `Backbone::Auth`),
/// types as exact label names, and the legacy epic reference as
/// `<epic-reference-prefix><epic title>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LabelScheme {
    /// Prefix of backbone labels
    pub backbone_prefix: String,
    /// Label marking an epic
    pub epic: String,
    /// Label marking a story
    pub story: String,
    /// Label marking a task
    pub task: String,
    /// Prefix of labels naming a parent epic by title
    pub epic_reference_prefix: String,
    /// Colors for created labels
    pub colors: LabelColors,
}

impl Default for LabelScheme {
    fn default() -> Self {
        Self {
            backbone_prefix: "Backbone::".to_string(),
            epic: "Type::Epic".to_string(),
            story: "Type::Story".to_string(),
            task: "Type::Task".to_string(),
            epic_reference_prefix: "Epic::".to_string(),
            colors: LabelColors::default(),
        }
    }
}

impl LabelScheme {
    /// Classifies an issue by its labels.
    ///
    /// Task wins over epic, and epic over story, when several type labels
    /// are present.
    pub fn kind(&self, labels: &[String]) -> IssueKind {
        let has = |wanted: &str| labels.iter().any(|l| l == wanted);
        if has(&self.task) {
            IssueKind::Task
        } else if has(&self.epic) {
            IssueKind::Epic
        } else if has(&self.story) {
            IssueKind::Story
        } else {
            IssueKind::Other
        }
    }

    /// Name of the first backbone label, without its prefix.
    pub fn backbone<'a>(&self, labels: &'a [String]) -> Option<&'a str> {
        labels
            .iter()
            .filter_map(|l| l.strip_prefix(self.backbone_prefix.as_str()))
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    /// Epic titles named by legacy epic-reference labels, in label order.
    pub fn epic_references<'a>(&'a self, labels: &'a [String]) -> impl Iterator<Item = &'a str> {
        labels
            .iter()
            .filter_map(|l| l.strip_prefix(self.epic_reference_prefix.as_str()))
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    /// The first epic-reference label, in full (e.g. `Epic::Login Flow`).
    pub fn epic_reference_label<'a>(&self, labels: &'a [String]) -> Option<&'a str> {
        labels
            .iter()
            .map(String::as_str)
            .find(|l| self.is_epic_reference(l))
    }

    /// Returns `true` for labels that are never created remotely.
    pub fn is_epic_reference(&self, label: &str) -> bool {
        label.starts_with(&self.epic_reference_prefix)
    }

    /// Color for a label being created.
    pub fn color_for(&self, label: &str) -> &str {
        if label.starts_with(&self.backbone_prefix) {
            &self.colors.backbone
        } else if label == self.epic {
            &self.colors.epic
        } else if label == self.story {
            &self.colors.story
        } else {
            &self.colors.default
        }
    }

    /// Label for a backbone name.
    pub fn backbone_label(&self, name: &str) -> String {
        format!("{}{name}", self.backbone_prefix)
    }
}
