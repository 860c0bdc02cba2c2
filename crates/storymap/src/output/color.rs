//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success: green   (created artifacts, completed commands)
//!   - Warning: yellow  (declined plans, skipped titles)
//!   - Error:   red     (failures)
//!   - Info:    cyan    (issue and placeholder ids)
//!   - Accent:  magenta (epics)
//!   - Muted:   dimmed  (paths, labels)

use crate::domain::IssueKind;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().bold().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Apply dimmed style to text.
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Short kind tag, colored by kind.
pub(crate) fn kind_tag(kind: IssueKind, config: &OutputConfig) -> String {
    let text = match kind {
        IssueKind::Epic => "[epic]",
        IssueKind::Story => "[story]",
        IssueKind::Task => "[task]",
        IssueKind::Other => "[issue]",
    };
    if !config.use_colors {
        return text.to_string();
    }
    match kind {
        IssueKind::Epic => text.magenta().bold().to_string(),
        IssueKind::Story => text.blue().to_string(),
        IssueKind::Task | IssueKind::Other => text.dimmed().to_string(),
    }
}
