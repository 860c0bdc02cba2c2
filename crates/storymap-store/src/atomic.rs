//! Atomic write operations for project state files.
//!
//! Every document storymap persists is replaced as a whole. Writes go through
//! the temp-file-then-rename pattern:
//!
//! 1. Data is first written to a sibling file with a `.tmp` extension
//! 2. The temporary file is flushed and synced
//! 3. The temporary file is renamed over the target path
//!
//! On POSIX systems a rename within one filesystem is atomic, so readers see
//! either the previous document or the new one, never a prefix of it. If a
//! crash happens before the rename, the original file remains intact and the
//! temporary file may be left behind.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use storymap_store::write_json_atomic;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut timestamps = BTreeMap::new();
//! timestamps.insert("1".to_string(), "2024-01-01T00:00:00Z".to_string());
//!
//! write_json_atomic(".cache/timestamps.json", &timestamps).await?;
//! # Ok(())
//! # }
//! ```

use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Atomically replaces `path` with `contents`.
///
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, the temporary
/// file cannot be written, or the final rename fails (e.g. across
/// filesystems). On failure the original file, if any, is left unchanged.
pub async fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = make_temp_path(path);

    if let Err(e) = write_to_temp_file(&temp_path, contents).await {
        // Best-effort cleanup of temp file
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    fs::rename(&temp_path, path).await?;
    tracing::trace!(path = %path.display(), bytes = contents.len(), "Replaced file atomically");

    Ok(())
}

/// Serializes `value` as YAML and atomically writes it to `path`.
///
/// # Errors
///
/// Returns an error if serialization fails or see [`write_atomic`].
pub async fn write_yaml_atomic<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let content = serde_yaml::to_string(value)?;
    write_atomic(path, content.as_bytes()).await
}

/// Serializes `value` as pretty-printed JSON and atomically writes it to `path`.
///
/// # Errors
///
/// Returns an error if serialization fails or see [`write_atomic`].
pub async fn write_json_atomic<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let mut content = serde_json::to_vec_pretty(value)?;
    content.push(b'\n');
    write_atomic(path, &content).await
}

/// Creates a temporary file path for atomic write operations.
///
/// `.tmp` is appended to the existing extension, or used as the extension when
/// the original path has none.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_to_temp_file(temp_path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::with_extension("/path/to/project_map.yaml", "/path/to/project_map.yaml.tmp")]
    #[case::without_extension("/path/to/file", "/path/to/file.tmp")]
    #[case::multiple_extensions("/path/to/file.tar.gz", "/path/to/file.tar.gz.tmp")]
    #[case::relative("timestamps.json", "timestamps.json.tmp")]
    fn make_temp_path_appends_tmp(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(make_temp_path(Path::new(input)), Path::new(expected));
    }

    #[tokio::test]
    async fn write_atomic_creates_missing_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("backbones/core/epic.md");

        write_atomic(&target, b"hello").await.unwrap();

        assert_eq!(fs::read_to_string(&target).await.unwrap(), "hello");
        assert!(!make_temp_path(&target).exists());
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("project_map.yaml");
        fs::write(&target, "old content\n").await.unwrap();

        write_atomic(&target, b"new content\n").await.unwrap();

        assert_eq!(fs::read_to_string(&target).await.unwrap(), "new content\n");
    }

    #[tokio::test]
    async fn write_json_atomic_is_pretty_and_newline_terminated() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("timestamps.json");
        let value = serde_json::json!({ "1": "2024-01-01T00:00:00Z" });

        write_json_atomic(&target, &value).await.unwrap();

        let content = fs::read_to_string(&target).await.unwrap();
        assert_eq!(content, "{\n  \"1\": \"2024-01-01T00:00:00Z\"\n}\n");
    }

    #[tokio::test]
    async fn write_atomic_fails_when_target_is_a_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).await.unwrap();

        let result = write_atomic(&target, b"data").await;

        assert!(result.is_err());
        assert!(target.is_dir());
    }
}
