//! Configuration for storymap.
//!
//! Settings live in `.storymap/config.yaml` at the repository root and are
//! loaded once per run. Environment variables (including those from a
//! `.env` file) override the tracker connection and data directory:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `STORYMAP_GITLAB_URL` | `gitlab.url` |
//! | `STORYMAP_GITLAB_TOKEN` | `gitlab.token` |
//! | `STORYMAP_PROJECT_ID` | `gitlab.project-id` |
//! | `STORYMAP_BOARD_ID` | `gitlab.board-id` |
//! | `STORYMAP_DATA_DIR` | `paths.data-dir` |

use crate::domain::LabelScheme;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Name of the storymap directory
pub const STORYMAP_DIR_NAME: &str = ".storymap";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Maximum directory depth to traverse when searching for the storymap root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Environment variable for the GitLab URL
pub const ENV_GITLAB_URL: &str = "STORYMAP_GITLAB_URL";
/// Environment variable for the access token
pub const ENV_GITLAB_TOKEN: &str = "STORYMAP_GITLAB_TOKEN";
/// Environment variable for the project id
pub const ENV_PROJECT_ID: &str = "STORYMAP_PROJECT_ID";
/// Environment variable for the board id
pub const ENV_BOARD_ID: &str = "STORYMAP_BOARD_ID";
/// Environment variable for the data directory
pub const ENV_DATA_DIR: &str = "STORYMAP_DATA_DIR";

/// Top-level configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorymapConfig {
    /// Tracker connection
    pub gitlab: GitlabConfig,

    /// Local layout
    pub paths: PathsConfig,

    /// Label naming scheme
    pub labels: LabelScheme,

    /// Upload behaviour
    pub upload: UploadConfig,
}

/// GitLab connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GitlabConfig {
    /// Instance URL, e.g. `https://gitlab.com`
    pub url: String,

    /// Numeric id or `group/project` path
    pub project_id: String,

    /// Board used to order newly uploaded stories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<u64>,

    /// Access token; prefer the environment over committing it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            url: "https://gitlab.com".to_string(),
            project_id: String::new(),
            board_id: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Paths relative to the repository root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PathsConfig {
    /// Directory holding one markdown file per issue
    pub data_dir: String,

    /// Serialized project map
    pub project_map: String,

    /// Directory for the timestamp cache
    pub cache_dir: String,

    /// Markdown documentation used as planning context
    pub docs_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "gitlab_data".to_string(),
            project_map: "project_map.yaml".to_string(),
            cache_dir: ".cache".to_string(),
            docs_dir: "docs".to_string(),
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UploadConfig {
    /// Delay between mutating tracker calls in milliseconds; 0 disables it
    pub throttle_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { throttle_ms: 100 }
    }
}

impl UploadConfig {
    /// Delay between mutating calls.
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl StorymapConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Apply `STORYMAP_*` overrides from the process environment.
    pub fn apply_process_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply `STORYMAP_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_GITLAB_URL) {
            self.gitlab.url = url;
        }
        if let Some(token) = get(ENV_GITLAB_TOKEN) {
            self.gitlab.token = Some(token);
        }
        if let Some(project_id) = get(ENV_PROJECT_ID) {
            self.gitlab.project_id = project_id;
        }
        if let Some(board_id) = get(ENV_BOARD_ID) {
            let parsed = board_id.parse().map_err(|_| ConfigError::Invalid {
                field: ENV_BOARD_ID.to_string(),
                reason: format!("'{board_id}' is not a board number"),
            })?;
            self.gitlab.board_id = Some(parsed);
        }
        if let Some(data_dir) = get(ENV_DATA_DIR) {
            self.paths.data_dir = data_dir;
        }
        Ok(())
    }

    /// Check that everything needed to reach the tracker is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for the first empty required
    /// setting, or [`ConfigError::Invalid`] for an unusable one.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.gitlab.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "gitlab.url",
                env_var: ENV_GITLAB_URL,
            });
        }
        if !self.gitlab.url.starts_with("http://") && !self.gitlab.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "gitlab.url".to_string(),
                reason: format!("'{}' must start with http:// or https://", self.gitlab.url),
            });
        }
        if self.gitlab.token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                field: "gitlab.token",
                env_var: ENV_GITLAB_TOKEN,
            });
        }
        if self.gitlab.project_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "gitlab.project-id",
                env_var: ENV_PROJECT_ID,
            });
        }
        if self.gitlab.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "gitlab.timeout-secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout for tracker calls.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.gitlab.timeout_secs)
    }
}

/// Config file written by `storymap init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = "\
# storymap configuration
#
# The token is best supplied via STORYMAP_GITLAB_TOKEN (or a .env file)
# rather than committed here.
gitlab:
  url: https://gitlab.com
  project-id: ''
  # board-id: 1
  timeout-secs: 30
paths:
  data-dir: gitlab_data
  project-map: project_map.yaml
  cache-dir: .cache
  docs-dir: docs
labels:
  backbone-prefix: 'Backbone::'
  epic: 'Type::Epic'
  story: 'Type::Story'
  task: 'Type::Task'
  epic-reference-prefix: 'Epic::'
upload:
  throttle-ms: 100
";

/// Find the storymap root directory by searching up the directory tree.
///
/// Returns the directory containing `.storymap/`, or `None` if none is
/// found within [`MAX_TRAVERSAL_DEPTH`] levels.
pub fn find_storymap_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(STORYMAP_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
