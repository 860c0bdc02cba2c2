//! Context handed to the planner.

use super::PlanRequest;
use crate::domain::NodeId;
use crate::error::Result;
use crate::workspace::Workspace;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Build a planning request from the docs directory and the project map.
///
/// The context lists the first line of every markdown file under the docs
/// directory (heading markers removed), followed by every uploaded issue that
/// has a file. Existing-issue summaries cover every map node.
pub async fn gather_context(workspace: &Workspace, description: &str) -> Result<PlanRequest> {
    let map = workspace.load_map().await?.value;

    let mut lines = Vec::new();
    for (path, summary) in doc_summaries(workspace.docs_dir()) {
        let shown = path
            .strip_prefix(workspace.root())
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        lines.push(format!("- {shown}: {summary}"));
    }
    for node in &map.nodes {
        if let (NodeId::Remote(iid), Some(path)) = (&node.id, &node.local_path) {
            lines.push(format!("- #{iid} {}: {path}", node.title));
        }
    }
    debug!(sources = lines.len(), "Gathered planning context");

    Ok(PlanRequest {
        description: description.to_string(),
        context: lines.join("\n"),
        existing_issues: map.summaries(),
    })
}

fn doc_summaries(docs_dir: &Path) -> Vec<(std::path::PathBuf, String)> {
    if !docs_dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
        .filter_map(|entry| {
            let path = entry.into_path();
            match first_line(&path) {
                Ok(line) => Some((path, line.replace('#', "").trim().to_string())),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable doc");
                    None
                }
            }
        })
        .collect()
}

fn first_line(path: &Path) -> std::io::Result<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line)
}
