//! Best-effort snapshot persistence
//!
//! One JSON file per named limiter. The limiter swallows every store
//! failure; a broken disk must never break rate limiting.

use super::state::LimiterState;
use crate::error::{PacerError, PacerResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Disk store for one limiter's snapshot
#[derive(Debug)]
pub(crate) struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for `name` under `dir`
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", file_slug(name))),
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot
    ///
    /// `Ok(None)` when no file exists. Unreadable or unparsable content is
    /// an error; the limiter downgrades it to "no prior state".
    pub fn load(&self) -> PacerResult<Option<LimiterState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            PacerError::Io(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let snap = serde_json::from_str(&content).map_err(|e| {
            PacerError::Json(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(Some(snap))
    }

    /// Write the snapshot, creating the directory if needed
    pub fn save(&self, state: &LimiterState) -> PacerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PacerError::Io(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).map_err(|e| {
            PacerError::Io(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), "saved limiter snapshot");
        Ok(())
    }
}

/// Filesystem-safe file stem for a limiter name
///
/// Lowercased, with every character outside `[a-z0-9_-]` replaced by `_`.
pub(crate) fn file_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
