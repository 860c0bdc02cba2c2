//! On-disk layout of a storymap repository.
//!
//! ```text
//! <root>/
//! ├── .storymap/config.yaml
//! ├── project_map.yaml
//! ├── .cache/timestamps.json
//! ├── docs/
//! └── gitlab_data/
//!     ├── backbones/...
//!     └── _unassigned/...
//! ```
//!
//! Every document is rewritten whole through the atomic writers in
//! `storymap_store`.

use crate::config::PathsConfig;
use crate::domain::{Issue, IssueState, NodeId, ProjectMap};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use storymap_store::{
    Loaded, compose, load_yaml_or_default, split, write_atomic, write_yaml_atomic,
};
use tracing::{debug, warn};

/// Name of the timestamp cache inside the cache directory
pub const TIMESTAMPS_FILE_NAME: &str = "timestamps.json";

#[derive(Serialize)]
struct IssueHeader<'a> {
    iid: &'a NodeId,
    title: &'a str,
    state: IssueState,
    labels: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    web_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<&'a str>,
}

/// Resolved locations of every persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    data_dir: PathBuf,
    map_path: PathBuf,
    cache_dir: PathBuf,
    docs_dir: PathBuf,
}

impl Workspace {
    /// Resolve `paths` against the repository `root`.
    pub fn new(root: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join(&paths.data_dir),
            map_path: root.join(&paths.project_map),
            cache_dir: root.join(&paths.cache_dir),
            docs_dir: root.join(&paths.docs_dir),
            root,
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the issue files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Serialized project map.
    pub fn map_path(&self) -> &Path {
        &self.map_path
    }

    /// Timestamp cache file.
    pub fn timestamps_path(&self) -> PathBuf {
        self.cache_dir.join(TIMESTAMPS_FILE_NAME)
    }

    /// Documentation directory used for planning context.
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Absolute path of an issue file given its `/`-separated relative path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMap`] if the path is absolute or has a
    /// component other than a plain name, since it could point outside the
    /// data directory.
    pub fn issue_path(&self, relative: &str) -> Result<PathBuf> {
        let escapes = || Error::InvalidMap(format!("issue path '{relative}' leaves the data directory"));
        if relative.starts_with('/') {
            return Err(escapes());
        }
        let mut path = self.data_dir.clone();
        for part in relative.split('/').filter(|part| !part.is_empty()) {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) => path.push(name),
                _ => return Err(escapes()),
            }
        }
        Ok(path)
    }

    /// Returns `true` if the project map has been written before.
    pub async fn map_exists(&self) -> bool {
        tokio::fs::try_exists(&self.map_path).await.unwrap_or(false)
    }

    /// Load the project map; a missing or corrupt map loads as empty.
    pub async fn load_map(&self) -> Result<Loaded<ProjectMap>> {
        Ok(load_yaml_or_default(&self.map_path).await?)
    }

    /// Atomically replace the project map.
    pub async fn save_map(&self, map: &ProjectMap) -> Result<()> {
        write_yaml_atomic(&self.map_path, map).await?;
        debug!(
            path = %self.map_path.display(),
            nodes = map.nodes.len(),
            links = map.links.len(),
            "Saved project map"
        );
        Ok(())
    }

    /// Write the file for a remote issue.
    pub async fn write_issue_file(&self, relative: &str, issue: &Issue) -> Result<()> {
        let id = issue.node_id();
        let header = IssueHeader {
            iid: &id,
            title: &issue.title,
            state: issue.state,
            labels: &issue.labels,
            web_url: issue.web_url.as_deref(),
            created_at: issue.created_at.as_deref(),
            updated_at: Some(issue.updated_at.as_str()).filter(|s| !s.is_empty()),
        };
        let body = issue.description.as_deref().unwrap_or_default();
        self.write_document(relative, &header, body).await
    }

    /// Write the file for a proposed (not yet uploaded) issue.
    pub async fn write_proposed_file(
        &self,
        relative: &str,
        id: &NodeId,
        title: &str,
        labels: &[String],
        description: &str,
    ) -> Result<()> {
        let header = IssueHeader {
            iid: id,
            title,
            state: IssueState::Opened,
            labels,
            web_url: None,
            created_at: None,
            updated_at: None,
        };
        self.write_document(relative, &header, description).await
    }

    async fn write_document(
        &self,
        relative: &str,
        header: &IssueHeader<'_>,
        body: &str,
    ) -> Result<()> {
        let content = compose(header, body)?;
        write_atomic(self.issue_path(relative)?, content.as_bytes()).await?;
        Ok(())
    }

    /// Read the body of an issue file without its front-matter.
    ///
    /// Returns `None` (with a warning) when the file cannot be read or its
    /// path leaves the data directory.
    pub async fn read_description(&self, relative: &str) -> Option<String> {
        let path = match self.issue_path(relative) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Refusing to read issue description");
                return None;
            }
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Some(split(&content).body.trim().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read issue description");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, MapNode};
    use rstest::rstest;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new(dir.path(), &PathsConfig::default())
    }

    #[test]
    fn layout_follows_config() {
        let ws = Workspace::new("/repo", &PathsConfig::default());
        assert_eq!(ws.data_dir(), Path::new("/repo/gitlab_data"));
        assert_eq!(ws.map_path(), Path::new("/repo/project_map.yaml"));
        assert_eq!(ws.timestamps_path(), Path::new("/repo/.cache/timestamps.json"));
        assert_eq!(
            ws.issue_path("backbones/auth/epic.md").unwrap(),
            Path::new("/repo/gitlab_data/backbones/auth/epic.md")
        );
    }

    #[rstest]
    #[case::parent("../outside.md")]
    #[case::nested_parent("backbones/../../outside.md")]
    #[case::current_dir("backbones/./epic.md")]
    #[case::absolute("/etc/passwd")]
    fn issue_path_stays_inside_data_dir(#[case] relative: &str) {
        let ws = Workspace::new("/repo", &PathsConfig::default());
        assert!(matches!(ws.issue_path(relative), Err(Error::InvalidMap(_))));
    }

    #[tokio::test]
    async fn escaping_path_is_neither_read_nor_written() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        tokio::fs::write(dir.path().join("secret.md"), "secret").await.unwrap();

        assert_eq!(ws.read_description("../secret.md").await, None);
        let err = ws
            .write_proposed_file("../escaped.md", &NodeId::from("NEW_1"), "X", &[], "body")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMap(_)));
        assert!(!dir.path().join("escaped.md").exists());
    }

    #[tokio::test]
    async fn issue_file_has_front_matter_then_description() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let mut issue = Issue::new(12, "Implement Login Feature")
            .with_labels(["Type::Epic"])
            .with_description("Users can sign in.")
            .with_updated_at("2024-05-02T10:00:00Z");
        issue.web_url = Some("https://gitlab.example.com/g/p/-/issues/12".to_string());

        ws.write_issue_file("backbones/auth/implement-login-feature/epic.md", &issue)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(
            ws.issue_path("backbones/auth/implement-login-feature/epic.md").unwrap(),
        )
        .await
        .unwrap();
        assert!(
            content.starts_with("---\niid: 12\ntitle: Implement Login Feature\nstate: opened\n")
        );
        assert!(content.ends_with("---\n\nUsers can sign in.\n"));

        let header: serde_yaml::Value =
            serde_yaml::from_str(split(&content).yaml.unwrap()).unwrap();
        assert_eq!(header["labels"][0].as_str(), Some("Type::Epic"));
        assert_eq!(header["updated_at"].as_str(), Some("2024-05-02T10:00:00Z"));
        assert!(header.get("created_at").is_none());
    }

    #[tokio::test]
    async fn read_description_strips_front_matter() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let id = NodeId::Placeholder("NEW_1".to_string());
        ws.write_proposed_file(
            "_unassigned/story-x.md",
            &id,
            "X",
            &["Type::Story".to_string()],
            "# X\n\nAs a user...",
        )
        .await
        .unwrap();

        let description = ws.read_description("_unassigned/story-x.md").await;
        assert_eq!(description.as_deref(), Some("# X\n\nAs a user..."));
    }

    #[tokio::test]
    async fn missing_file_has_no_description() {
        let dir = TempDir::new().unwrap();
        assert_eq!(workspace(&dir).read_description("nope.md").await, None);
    }

    #[tokio::test]
    async fn map_roundtrips_and_missing_map_is_empty() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert!(!ws.map_exists().await);
        assert_eq!(ws.load_map().await.unwrap().value, ProjectMap::default());

        let map = ProjectMap {
            nodes: vec![MapNode {
                id: NodeId::Remote(1),
                title: "Epic".to_string(),
                state: IssueState::Opened,
                labels: vec!["Type::Epic".to_string()],
                web_url: None,
                local_path: Some("_unassigned/epic.md".to_string()),
                description: None,
            }],
            links: vec![Edge::blocks(1_u64, 2_u64)],
        };
        ws.save_map(&map).await.unwrap();

        assert!(ws.map_exists().await);
        assert_eq!(ws.load_map().await.unwrap().value, map);
    }
}
