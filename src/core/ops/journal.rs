//! core::ops::journal
//!
//! Persistent record of an update that paused on conflicts.
//!
//! `SyncEngine::update` records the purely local commits before it rebases,
//! because a successful rebase rewrites them and the host must prune the old
//! ids from its history view. When the rebase pauses, those ids have to survive
//! until `ConflictResolver` finishes the operation, possibly in another
//! process, so they are written to `<git_dir>/vcbridge/pending.json`.
//!
//! The journal only supplements the tool's own markers. Whether an operation
//! is paused is always decided from the markers; a journal without markers is
//! stale and is discarded.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::RepoPaths;
use crate::core::types::{CommitId, OperationKind};

/// Errors from journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The pending update record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJournal {
    /// Which operation the update started.
    pub kind: OperationKind,
    /// Local-only commits as they were before rebasing.
    pub local_commit_ids: Vec<CommitId>,
    pub started_at: DateTime<Utc>,
}

impl UpdateJournal {
    pub fn new(kind: OperationKind, local_commit_ids: Vec<CommitId>) -> Self {
        Self {
            kind,
            local_commit_ids,
            started_at: Utc::now(),
        }
    }

    pub fn path(paths: &RepoPaths) -> PathBuf {
        paths.journal_path()
    }

    /// Write the journal, replacing any previous one.
    pub fn write(&self, paths: &RepoPaths) -> Result<(), JournalError> {
        fs::create_dir_all(paths.bridge_dir())?;

        let path = Self::path(paths);
        let temp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp, &path)?;

        Ok(())
    }

    /// Read the journal, if present.
    pub fn read(paths: &RepoPaths) -> Result<Option<Self>, JournalError> {
        let path = Self::path(paths);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Remove the journal. Removing a missing journal is not an error.
    pub fn remove(paths: &RepoPaths) -> Result<(), JournalError> {
        let path = Self::path(paths);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn exists(paths: &RepoPaths) -> bool {
        Self::path(paths).exists()
    }
}
