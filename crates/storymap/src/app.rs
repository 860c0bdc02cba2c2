//! Application context for CLI command execution.
//!
//! [`App`] resolves the repository root, loads `.storymap/config.yaml`,
//! applies environment overrides once, and hands the resolved configuration
//! to the engine components by reference.
//!
//! # Example
//!
//! ```no_run
//! use storymap::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let tracker = app.connect()?;
//!     let report = app.sync_engine(tracker.as_ref()).sync().await?;
//!     println!("{} changed", report.updated_count);
//!     Ok(())
//! }
//! ```

use crate::config::{CONFIG_FILE_NAME, STORYMAP_DIR_NAME, StorymapConfig, find_storymap_root};
use crate::error::{ConfigError, Result};
use crate::mapper::ProjectMapper;
use crate::plan::{PlanMaterializer, Sanitizer};
use crate::sync::SyncEngine;
use crate::tracker::{GitlabTracker, Tracker};
use crate::upload::UploadTransaction;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved configuration and workspace of one storymap repository.
#[derive(Debug, Clone)]
pub struct App {
    root: PathBuf,
    config: StorymapConfig,
    workspace: Workspace,
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.storymap/`, loads the config and
    /// applies `STORYMAP_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if no repository is found, the config cannot be
    /// parsed, or an override is invalid.
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_storymap_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let config_path = root.join(STORYMAP_DIR_NAME).join(CONFIG_FILE_NAME);

        let mut config = StorymapConfig::load(&config_path).await?;
        config.apply_process_env()?;
        debug!(root = %root.display(), "Loaded storymap config");

        Ok(Self::new(root, config))
    }

    /// Create an App from an already resolved configuration.
    pub fn new(root: impl Into<PathBuf>, config: StorymapConfig) -> Self {
        let root = root.into();
        let workspace = Workspace::new(&root, &config.paths);
        Self {
            root,
            config,
            workspace,
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolved configuration.
    pub fn config(&self) -> &StorymapConfig {
        &self.config
    }

    /// On-disk layout.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Validate the tracker settings and build the GitLab client.
    ///
    /// # Errors
    ///
    /// Fails fast with a [`ConfigError`] before any remote call if the url,
    /// token or project id is missing.
    pub fn connect(&self) -> Result<Box<dyn Tracker>> {
        self.config.validate()?;
        let gitlab = &self.config.gitlab;
        let token = gitlab.token.as_deref().unwrap_or_default();
        let tracker = GitlabTracker::new(&gitlab.url, &gitlab.project_id, token, self.config.timeout())?;
        Ok(Box::new(tracker))
    }

    /// Full remote → local projection.
    pub fn mapper<'a>(&'a self, tracker: &'a dyn Tracker) -> ProjectMapper<'a> {
        ProjectMapper::new(tracker, &self.workspace, &self.config.labels)
    }

    /// Timestamp-based change detection.
    pub fn sync_engine<'a>(&'a self, tracker: &'a dyn Tracker) -> SyncEngine<'a> {
        SyncEngine::new(tracker, &self.workspace)
    }

    /// Upload of proposed issues, with the configured board and throttle.
    pub fn upload_transaction<'a>(&'a self, tracker: &'a dyn Tracker) -> UploadTransaction<'a> {
        UploadTransaction::new(tracker, &self.workspace, &self.config.labels)
            .with_board(self.config.gitlab.board_id)
            .with_throttle(self.config.upload.throttle())
    }

    /// Writer for approved plans.
    pub fn materializer(&self) -> PlanMaterializer<'_> {
        PlanMaterializer::new(&self.workspace, &self.config.labels)
    }

    /// Masks the tracker URL and project id in planner traffic.
    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new(&self.config.gitlab.url, &self.config.gitlab.project_id)
    }
}
