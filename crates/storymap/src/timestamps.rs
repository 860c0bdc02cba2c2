//! Last-seen modification timestamps per remote issue.
//!
//! Stored as a flat JSON object mapping issue number (as a string) to the
//! `updated_at` value observed during the previous sync. The cache is only
//! ever replaced whole, so issues deleted remotely drop out on the next run.

use crate::domain::Issue;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use storymap_store::{load_json_or_default, write_json_atomic};
use tracing::warn;

/// Issue number → `updated_at` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampCache {
    entries: BTreeMap<String, String>,
}

impl TimestampCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the given issues.
    pub fn from_issues<'a, I>(issues: I) -> Self
    where
        I: IntoIterator<Item = &'a Issue>,
    {
        Self {
            entries: issues
                .into_iter()
                .map(|i| (i.iid.to_string(), i.updated_at.clone()))
                .collect(),
        }
    }

    /// Load the cache; a missing or corrupt file is an empty cache.
    pub async fn load(path: &Path) -> Result<Self> {
        let loaded = load_json_or_default::<Self, _>(path).await?;
        if loaded.recovered() {
            warn!(path = %path.display(), "Timestamp cache discarded, treating as first run");
        }
        Ok(loaded.value)
    }

    /// Atomically replace the cache file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).await?;
        Ok(())
    }

    /// Timestamp last seen for `iid`.
    pub fn get(&self, iid: u64) -> Option<&str> {
        self.entries.get(&iid.to_string()).map(String::as_str)
    }

    /// Record a timestamp.
    pub fn insert(&mut self, iid: u64, updated_at: impl Into<String>) {
        self.entries.insert(iid.to_string(), updated_at.into());
    }

    /// Returns `true` if `issue` is new or changed since it was cached.
    ///
    /// ISO-8601 timestamps in one format order correctly as plain strings.
    pub fn is_stale(&self, issue: &Issue) -> bool {
        self.get(issue.iid)
            .is_none_or(|cached| cached < issue.updated_at.as_str())
    }

    /// Number of cached issues.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::absent(None, "2024-01-01T00:00:00Z", true)]
    #[case::unchanged(Some("2024-01-01T00:00:00Z"), "2024-01-01T00:00:00Z", false)]
    #[case::newer(Some("2024-01-01T00:00:00Z"), "2024-01-02T00:00:00Z", true)]
    #[case::older_remote(Some("2024-01-02T00:00:00Z"), "2024-01-01T00:00:00Z", false)]
    fn staleness(#[case] cached: Option<&str>, #[case] current: &str, #[case] expected: bool) {
        let mut cache = TimestampCache::new();
        if let Some(ts) = cached {
            cache.insert(1, ts);
        }
        let issue = Issue::new(1, "x").with_updated_at(current);
        assert_eq!(cache.is_stale(&issue), expected);
    }

    #[tokio::test]
    async fn serializes_as_flat_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cache").join("timestamps.json");
        let mut cache = TimestampCache::new();
        cache.insert(2, "T1");
        cache.insert(10, "T2");

        cache.save(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"2": "T1", "10": "T2"}));
        assert_eq!(TimestampCache::load(&path).await.unwrap(), cache);
    }

    #[tokio::test]
    async fn corrupt_cache_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timestamps.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(TimestampCache::load(&path).await.unwrap().is_empty());
    }
}
