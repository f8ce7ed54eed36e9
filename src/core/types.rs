//! core::types
//!
//! Strong types for the version-control domain.
//!
//! # Types
//!
//! - [`CommitId`] - Validated object identifier (SHA-1 or SHA-256 hex)
//! - [`Change`] / [`ChangeSet`] - File deltas grouped by kind
//! - [`HistoryEntry`] - A commit as shown in the host's history view
//! - [`Branch`] / [`Stash`] - Branch and stash listings
//! - [`UpdateState`] / [`SyncFailure`] - Outcome of fetch/push/update
//! - [`ConflictHandling`] / [`ConflictResolveState`] - Conflict resolution requests
//! - [`PendingOperation`] - A paused merge or rebase
//!
//! # Examples
//!
//! ```
//! use vcbridge::core::types::{Change, ChangeSet, CommitId};
//!
//! let id = CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(id.short(7), "abc123d");
//!
//! let mut changes = ChangeSet::default();
//! changes.new_files.push(Change::new("scene.ma"));
//! assert_eq!(changes.size(), 1);
//! ```

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidCommitId(String),
}

/// A validated object identifier.
///
/// Stored lowercase. Accepts 40 (SHA-1) or 64 (SHA-256) hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Create a new validated commit id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the string is not a valid hex id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into().trim().to_ascii_lowercase();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get an abbreviated form of the id.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.len() != 40 && id.len() != 64 {
            return Err(TypeError::InvalidCommitId(format!(
                "expected 40 or 64 hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitId(format!(
                "contains non-hex characters: {}",
                id
            )));
        }
        Ok(())
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        // git2 always renders lowercase hex of a valid length
        Self(oid.to_string())
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A single file delta, paths relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    /// Previous path, set only for renames.
    pub old_path: Option<String>,
    /// Local cache location of the binary content, when resolved.
    pub cached_path: Option<String>,
}

impl Change {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            cached_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_path: Some(old_path.into()),
            cached_path: None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(f, "{} -> {}", old, self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// Four disjoint ordered sequences of changes.
///
/// A path appears in at most one sequence. Use [`ChangeSet::insert`] to keep
/// that invariant when building a set incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub new_files: Vec<Change>,
    pub modified_files: Vec<Change>,
    pub deleted_files: Vec<Change>,
    pub renamed_files: Vec<Change>,
}

/// Which sequence of a [`ChangeSet`] a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeSet {
    /// Total number of changes across all sequences.
    pub fn size(&self) -> usize {
        self.new_files.len()
            + self.modified_files.len()
            + self.deleted_files.len()
            + self.renamed_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Insert a change unless its path is already present in any sequence.
    ///
    /// Returns `false` when the path was already recorded.
    pub fn insert(&mut self, kind: ChangeKind, change: Change) -> bool {
        if self.contains(&change.path) {
            return false;
        }
        let list = match kind {
            ChangeKind::New => &mut self.new_files,
            ChangeKind::Modified => &mut self.modified_files,
            ChangeKind::Deleted => &mut self.deleted_files,
            ChangeKind::Renamed => &mut self.renamed_files,
        };
        list.push(change);
        true
    }

    /// Check whether any sequence contains `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.iter().any(|(_, c)| c.path == path)
    }

    /// Iterate over all changes with their kind, in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &Change)> {
        self.new_files
            .iter()
            .map(|c| (ChangeKind::New, c))
            .chain(self.modified_files.iter().map(|c| (ChangeKind::Modified, c)))
            .chain(self.deleted_files.iter().map(|c| (ChangeKind::Deleted, c)))
            .chain(self.renamed_files.iter().map(|c| (ChangeKind::Renamed, c)))
    }

    /// All paths in this set.
    pub fn paths(&self) -> Vec<String> {
        self.iter().map(|(_, c)| c.path.clone()).collect()
    }

    /// Verify that no path appears twice.
    pub fn is_disjoint(&self) -> bool {
        let mut seen = HashSet::new();
        self.iter().all(|(_, c)| seen.insert(c.path.as_str()))
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let sections = [
            ("New Files", &self.new_files),
            ("Changed Files", &self.modified_files),
            ("Deleted Files", &self.deleted_files),
            ("Renamed Files", &self.renamed_files),
        ];
        let mut first = true;
        for (title, list) in sections {
            if list.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{}:", title)?;
            for change in list {
                writeln!(f, "  {}", change)?;
            }
        }
        Ok(())
    }
}

/// Where a history entry lives relative to the upstream branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    /// Present locally and on the remote.
    Synced,
    /// Fetched but not yet integrated locally.
    RemoteOnly,
    /// Committed locally, not yet pushed.
    LocalOnly,
}

/// A commit as shown in the host's history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: CommitId,
    /// Author email.
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub kind: HistoryKind,
    pub parents: Vec<CommitId>,
}

/// A local or remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub id: Option<CommitId>,
    pub last_changed: Option<DateTime<Utc>>,
    pub is_local: bool,
}

/// A stash entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    /// Stash selector, e.g. `stash@{0}`.
    pub id: String,
    pub message: String,
    /// Branch the stash was created on, if it could be determined.
    pub branch: Option<String>,
}

/// Why a sync operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFailure {
    /// The working tree has uncommitted changes; nothing was contacted.
    UncommittedChanges,
    /// Pulling would overwrite local files.
    WouldOverwrite,
    /// Credentials rejected or remote not accessible.
    AuthOrAccess,
    /// The remote could not be reached.
    Network,
    /// The remote has newer commits; fetch/update first.
    NonFastForward,
    /// Anything else, with the tool's message.
    Other(String),
}

impl SyncFailure {
    /// Informational failures are surfaced as `info`, never as errors.
    pub fn is_informational(&self) -> bool {
        matches!(self, SyncFailure::UncommittedChanges | SyncFailure::WouldOverwrite)
    }

    /// Short user-facing title.
    pub fn title(&self) -> &'static str {
        match self {
            SyncFailure::UncommittedChanges => "Cannot pull",
            SyncFailure::WouldOverwrite => "Files would be overwritten",
            SyncFailure::AuthOrAccess => "Invalid Git Credentials",
            SyncFailure::Network => "Could not connect to the Git server",
            SyncFailure::NonFastForward => "There are newer changes on the server",
            SyncFailure::Other(_) => "Git operation failed",
        }
    }

    /// Longer user-facing explanation.
    pub fn message(&self) -> String {
        match self {
            SyncFailure::UncommittedChanges => {
                "You have to commit all your files before you can continue".to_string()
            }
            SyncFailure::WouldOverwrite => {
                "Your local changes would be overwritten. Commit your files first".to_string()
            }
            SyncFailure::AuthOrAccess => {
                "Your credentials were rejected or the repository cannot be accessed".to_string()
            }
            SyncFailure::Network => {
                "Please check your internet connection and try again".to_string()
            }
            SyncFailure::NonFastForward => {
                "Someone pushed in the meantime. Update first, then push again".to_string()
            }
            SyncFailure::Other(message) => message.clone(),
        }
    }
}

/// Outcome of fetch, push, or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Ok,
    Error(SyncFailure),
    /// The operation paused on conflicts.
    Conflict,
    /// The current branch has no upstream.
    NoRemote,
    /// The user canceled.
    Cancel,
}

impl UpdateState {
    pub fn is_ok(&self) -> bool {
        matches!(self, UpdateState::Ok)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateState::Ok => f.write_str("ok"),
            UpdateState::Error(failure) => write!(f, "error: {}", failure.title()),
            UpdateState::Conflict => f.write_str("conflict"),
            UpdateState::NoRemote => f.write_str("no remote"),
            UpdateState::Cancel => f.write_str("canceled"),
        }
    }
}

/// Which side the tool should keep for a conflicted path.
///
/// These are the tool's own `--ours`/`--theirs` meanings, which invert while
/// rebasing. User requests are expressed with [`ConflictHandling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolveState {
    TakeOurs,
    TakeTheirs,
    /// Content already edited by hand; only mark as resolved.
    Resolved,
}

impl ConflictResolveState {
    /// The checkout flag for this side, if any.
    pub fn checkout_flag(&self) -> Option<&'static str> {
        match self {
            ConflictResolveState::TakeOurs => Some("--ours"),
            ConflictResolveState::TakeTheirs => Some("--theirs"),
            ConflictResolveState::Resolved => None,
        }
    }
}

/// A user's conflict resolution request.
///
/// `TakeOurs` always means "keep my local work" from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictHandling {
    Cancel,
    External,
    TakeOurs,
    TakeTheirs,
}

/// Kind of a paused operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Merge,
    Rebase,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Merge => f.write_str("merge"),
            OperationKind::Rebase => f.write_str("rebase"),
        }
    }
}

/// A merge or rebase halted mid-way, re-derived from disk on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: OperationKind,
    /// The commit being replayed (rebase) or merged in (merge).
    pub paused_head_ref: Option<CommitId>,
    /// Local-only commits recorded before an update started rebasing.
    pub queued_local_commit_ids: Vec<CommitId>,
}

impl PendingOperation {
    pub fn is_rebase(&self) -> bool {
        self.kind == OperationKind::Rebase
    }
}
