//! Time-boxed workflow listing cache, persisted as a single JSON file.
//!
//! The cache holds exactly one entry: the last listing fetched from the
//! service and when it was fetched.  Anything that goes wrong while reading
//! the entry is a cache miss, so a corrupt or deleted file heals itself on
//! the next live fetch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use runninghub_api::{WorkflowApi, WorkflowDescriptor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// How long a fetched listing is served without contacting the service.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(60 * 60);

/// The persisted cache document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCacheEntry {
    pub workflows: Vec<WorkflowDescriptor>,
    /// When the listing was fetched (ISO-8601, UTC).
    pub timestamp: DateTime<Utc>,
}

impl WorkflowCacheEntry {
    /// Whether the entry is younger than `freshness` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        let Ok(window) = chrono::Duration::from_std(freshness) else {
            return true;
        };
        now.signed_duration_since(self.timestamp) < window
    }
}

/// File-backed cache of the workflow listing.
#[derive(Debug, Clone)]
pub struct WorkflowCache {
    path: PathBuf,
    freshness: Duration,
}

impl WorkflowCache {
    /// A cache stored at `path` with the default one-hour freshness window.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            freshness: DEFAULT_FRESHNESS,
        }
    }

    /// Override the freshness window.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the workflow listing, from the cache when it is fresh and
    /// `force_refresh` is not set, otherwise from `api`.
    ///
    /// A live fetch overwrites the cache entry.  Fetch errors propagate and
    /// leave the existing entry untouched.
    pub async fn get_workflows(
        &self,
        api: &dyn WorkflowApi,
        force_refresh: bool,
    ) -> Result<Vec<WorkflowDescriptor>> {
        if !force_refresh
            && let Some(entry) = self.read_entry().await
            && entry.is_fresh(Utc::now(), self.freshness)
        {
            debug!(
                path = %self.path.display(),
                count = entry.workflows.len(),
                "serving workflow listing from cache"
            );
            return Ok(entry.workflows);
        }

        let workflows = api.list_workflows().await?;
        let entry = WorkflowCacheEntry {
            workflows,
            timestamp: Utc::now(),
        };
        self.write_entry(&entry).await?;
        info!(
            path = %self.path.display(),
            count = entry.workflows.len(),
            force_refresh,
            "workflow listing refreshed"
        );
        Ok(entry.workflows)
    }

    /// Read the persisted entry; `None` on any read or parse failure.
    pub async fn read_entry(&self) -> Option<WorkflowCacheEntry> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "workflow cache unavailable");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring unreadable workflow cache");
                None
            }
        }
    }

    async fn write_entry(&self, entry: &WorkflowCacheEntry) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entry)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
