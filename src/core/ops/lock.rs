//! core::ops::lock
//!
//! Exclusive per-repository operation lock.
//!
//! Only one mutating operation (fetch, push, update, resolve, track, stage)
//! may run against a working copy at a time. The lock lives at
//! `<git_dir>/vcbridge/lock` and is keyed by the canonical repository path, so
//! two handles opened through different spellings of the same directory share
//! it. The holder writes its pid and operation name into the file so a
//! refused caller can say what it is waiting on.
//!
//! The lock does not protect the repository against other tools. The external
//! tool's own lock files (`index.lock`, ...) are relied upon for that.
//!
//! # Invariants
//!
//! - Acquisition is non-blocking (fails fast if held)
//! - Released on drop
//! - OS-level (`fs2`), so it also excludes other processes

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::paths::RepoPaths;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another operation holds the lock.
    #[error("{} is busy{}", .work_dir.display(), holder_suffix(.holder))]
    Busy {
        work_dir: PathBuf,
        /// `pid operation` of the holder, when it could be read.
        holder: Option<String>,
    },

    #[error("cannot prepare lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn holder_suffix(holder: &Option<String>) -> String {
    holder.as_deref().map(|h| format!(" ({h})")).unwrap_or_default()
}

/// Held operation lock on one working copy.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    operation: String,
    file: File,
}

impl RepoLock {
    /// Take the lock for `operation`.
    ///
    /// # Errors
    ///
    /// - [`LockError::Busy`] if another operation holds the lock
    /// - [`LockError::Io`] if the lock file cannot be created or locked
    pub fn acquire(paths: &RepoPaths, operation: &str) -> Result<Self, LockError> {
        let path = paths.lock_path();
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(paths.bridge_dir()).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() != std::io::ErrorKind::WouldBlock {
                return Err(io_err(e));
            }
            let holder = Self::holder(paths);
            debug!(?holder, operation, "operation lock is held");
            return Err(LockError::Busy {
                work_dir: paths.work_dir.clone(),
                holder,
            });
        }

        // Stale holder text from an earlier run is overwritten in place
        let stamp = format!("{} {}", std::process::id(), operation);
        let written = file
            .set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(stamp.as_bytes()));
        if let Err(e) = written {
            warn!(error = %e, "cannot record lock holder");
        }

        debug!(operation, "acquired operation lock");
        Ok(Self {
            path,
            operation: operation.to_string(),
            file,
        })
    }

    /// Take the lock for the working copy at `work_dir`, canonicalized
    /// first so every spelling maps to one lock.
    pub fn acquire_for(work_dir: &Path, operation: &str) -> Result<Self, LockError> {
        let canonical = work_dir.canonicalize().map_err(|source| LockError::Io {
            path: work_dir.to_path_buf(),
            source,
        })?;
        Self::acquire(&RepoPaths::for_work_dir(&canonical), operation)
    }

    /// The recorded `pid operation` of the current or last holder.
    pub fn holder(paths: &RepoPaths) -> Option<String> {
        let text = fs::read_to_string(paths.lock_path()).ok()?;
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "releasing operation lock failed");
        }
        debug!(operation = %self.operation, "released operation lock");
    }
}
