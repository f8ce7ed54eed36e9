//! git::error
//!
//! Typed failures of git operations and classification of tool output.
//!
//! # Classification
//!
//! The external tool reports failures as free text on stderr. [`classify_stderr`]
//! maps that text to a [`StderrClass`] so higher layers can tell an
//! authentication rejection from a network outage from a non-fast-forward push
//! without string matching of their own. The function is pure and is the only
//! place that knows the tool's wording.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::ops::journal::JournalError;
use crate::core::types::{SyncFailure, TypeError};

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository at (or above) the path.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// A repository already exists where one was to be created.
    #[error("a git repository already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Credentials rejected or the remote cannot be accessed.
    #[error("authentication failed or repository not accessible: {message}")]
    AuthOrAccess { message: String },

    /// The remote could not be reached.
    #[error("could not connect to the server: {message}")]
    Network { message: String },

    /// The remote rejected a push because it has newer commits.
    #[error("push rejected, the remote has newer changes: {message}")]
    NonFastForward { message: String },

    /// Pulling would overwrite files in the working tree.
    #[error("local files would be overwritten: {message}")]
    WouldOverwrite { message: String },

    /// A file is opened by another application.
    #[error("file is in use by another application: {message}")]
    FileInUse { message: String },

    /// The index is corrupt.
    #[error("the git index is corrupt: {message}")]
    IndexCorrupt { message: String },

    /// Another git process holds the index lock.
    #[error("the git index is locked by another process: {message}")]
    IndexLocked { message: String },

    /// The user canceled the operation.
    #[error("operation canceled")]
    Canceled,

    /// A required executable was not found on PATH.
    #[error("could not find '{0}' on PATH")]
    ToolNotFound(String),

    /// Invalid caller input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A subprocess exited unsuccessfully for an unrecognized reason.
    #[error("git {command} failed{}: {stderr}", exit_suffix(.code))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit {})", c)).unwrap_or_default()
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::Locked => GitError::IndexLocked {
                message: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::Internal {
            message: err.to_string(),
        }
    }
}

impl GitError {
    /// Build an error from a failed subprocess, classifying its stderr.
    pub fn from_command(command: &str, code: Option<i32>, stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        match classify_stderr(stderr) {
            Some(StderrClass::AuthOrAccess) => GitError::AuthOrAccess { message },
            Some(StderrClass::Network) => GitError::Network { message },
            Some(StderrClass::NonFastForward) => GitError::NonFastForward { message },
            Some(StderrClass::WouldOverwrite) => GitError::WouldOverwrite { message },
            Some(StderrClass::FileInUse) => GitError::FileInUse { message },
            Some(StderrClass::IndexCorrupt) => GitError::IndexCorrupt { message },
            Some(StderrClass::IndexLocked) => GitError::IndexLocked { message },
            Some(StderrClass::NotARepo) => GitError::NotARepo {
                path: PathBuf::new(),
            },
            Some(StderrClass::Conflict) | None => GitError::Command {
                command: command.to_string(),
                code,
                stderr: message,
            },
        }
    }

    /// The sync outcome this error represents.
    pub fn to_sync_failure(&self) -> SyncFailure {
        match self {
            GitError::AuthOrAccess { .. } => SyncFailure::AuthOrAccess,
            GitError::Network { .. } => SyncFailure::Network,
            GitError::NonFastForward { .. } => SyncFailure::NonFastForward,
            GitError::WouldOverwrite { .. } => SyncFailure::WouldOverwrite,
            other => SyncFailure::Other(other.to_string()),
        }
    }
}

/// Category of a failure message printed by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrClass {
    AuthOrAccess,
    Network,
    NonFastForward,
    WouldOverwrite,
    FileInUse,
    IndexCorrupt,
    IndexLocked,
    NotARepo,
    Conflict,
}

impl fmt::Display for StderrClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StderrClass::AuthOrAccess => "auth-or-access",
            StderrClass::Network => "network",
            StderrClass::NonFastForward => "non-fast-forward",
            StderrClass::WouldOverwrite => "would-overwrite",
            StderrClass::FileInUse => "file-in-use",
            StderrClass::IndexCorrupt => "index-corrupt",
            StderrClass::IndexLocked => "index-locked",
            StderrClass::NotARepo => "not-a-repo",
            StderrClass::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

/// Classify the stderr of a failed git invocation.
///
/// Checks run in a fixed order; the first match wins. Returns `None` when the
/// text matches nothing known.
pub fn classify_stderr(stderr: &str) -> Option<StderrClass> {
    let has = |needle: &str| stderr.contains(needle);

    if has("warning: failed to remove")
        || has("error: unable to unlink")
        || has("error: unable to index file")
    {
        return Some(StderrClass::FileInUse);
    }
    if has("would be overwritten by") {
        return Some(StderrClass::WouldOverwrite);
    }
    if has("Not a git repository") || has("not a git repository") {
        return Some(StderrClass::NotARepo);
    }
    if has("index file corrupt")
        || has("unknown index entry format")
        || has("cache entry out of order")
    {
        return Some(StderrClass::IndexCorrupt);
    }
    if (has("fatal: repository") && (has("not found") || has("does not exist")))
        || has("does not appear to be a git repository")
        || has("could not read Password")
        || has("could not read Username")
        || has("Authentication failed")
        || has("Permission denied (publickey)")
    {
        return Some(StderrClass::AuthOrAccess);
    }
    if has("Couldn't connect to server")
        || has("Could not resolve host")
        || has("Timed out")
        || has("Connection refused")
        || has("no such host")
    {
        return Some(StderrClass::Network);
    }
    // "failed to push some refs" follows every rejection, hook declines included
    if has("non-fast-forward")
        || has("(fetch first)")
        || has("tip of your current branch is behind")
    {
        return Some(StderrClass::NonFastForward);
    }
    if has("CONFLICT") || has("unmerged") {
        return Some(StderrClass::Conflict);
    }
    if has(".git/index.lock") {
        return Some(StderrClass::IndexLocked);
    }
    None
}
