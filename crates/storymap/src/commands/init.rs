//! Implementation of the `init` command.
//!
//! Creates `.storymap/config.yaml` from the commented default template and a
//! root `.gitignore` keeping the cache and `.env` out of version control.

use crate::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, STORYMAP_DIR_NAME};
use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

const GITIGNORE_CONTENT: &str = "\
# storymap local state
.cache/
.env
";

/// Result of the init command
#[derive(Debug, Serialize)]
pub struct InitResult {
    /// Path to the created storymap directory
    pub storymap_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created gitignore, if none existed
    pub gitignore_file: Option<PathBuf>,
}

/// Initialize a new storymap repository in `base_dir`.
///
/// An existing `.gitignore` is left untouched.
///
/// # Errors
///
/// Returns an error if `.storymap/` already exists or a file cannot be
/// written.
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let storymap_dir = base_dir.join(STORYMAP_DIR_NAME);
    if fs::try_exists(&storymap_dir).await? {
        return Err(ConfigError::Invalid {
            field: STORYMAP_DIR_NAME.to_string(),
            reason: "storymap is already initialized in this directory".to_string(),
        }
        .into());
    }

    fs::create_dir_all(&storymap_dir).await?;
    let config_file = storymap_dir.join(CONFIG_FILE_NAME);
    fs::write(&config_file, DEFAULT_CONFIG_TEMPLATE).await?;

    let gitignore = base_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_file = if fs::try_exists(&gitignore).await? {
        None
    } else {
        fs::write(&gitignore, GITIGNORE_CONTENT).await?;
        Some(gitignore)
    };

    Ok(InitResult {
        storymap_dir,
        config_file,
        gitignore_file,
    })
}

/// Returns `true` if `base_dir` holds a `.storymap/` directory.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(STORYMAP_DIR_NAME).is_dir()
}
