//! worker
//!
//! Background execution of repository operations.
//!
//! Every externally triggered operation runs on its own named thread while
//! holding the repository's [`RepoLock`]. The lock is taken before the thread
//! starts, so a second operation on the same working copy fails immediately
//! with [`WorkerError::Busy`] instead of queueing behind the first.

use std::path::Path;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::ops::lock::{LockError, RepoLock};
use crate::progress::CancelFlag;

/// Errors from spawning or joining an operation.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Another operation holds the repository.
    #[error(transparent)]
    Busy(LockError),

    #[error(transparent)]
    Lock(LockError),

    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("operation '{0}' panicked")]
    Panicked(String),
}

impl From<LockError> for WorkerError {
    fn from(err: LockError) -> Self {
        match err {
            busy @ LockError::Busy { .. } => WorkerError::Busy(busy),
            other => WorkerError::Lock(other),
        }
    }
}

/// A running operation.
#[derive(Debug)]
pub struct OperationHandle<T> {
    name: String,
    cancel: CancelFlag,
    handle: JoinHandle<T>,
}

impl<T> OperationHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the operation to stop at its next output line.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the operation and return its result.
    pub fn join(self) -> Result<T, WorkerError> {
        self.handle.join().map_err(|_| {
            warn!(operation = %self.name, "operation panicked");
            WorkerError::Panicked(self.name)
        })
    }
}

/// Run `op` on a background thread while holding the lock for `repo_path`.
///
/// `op` receives the operation's cancel flag.
pub fn spawn_operation<T, F>(repo_path: &Path, name: &str, op: F) -> Result<OperationHandle<T>, WorkerError>
where
    T: Send + 'static,
    F: FnOnce(CancelFlag) -> T + Send + 'static,
{
    let lock = RepoLock::acquire_for(repo_path, name)?;
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    let label = name.to_string();

    let handle = thread::Builder::new()
        .name(format!("vcb-{name}"))
        .spawn(move || {
            debug!(operation = %label, "operation started");
            let result = op(flag);
            drop(lock);
            debug!(operation = %label, "operation finished");
            result
        })?;

    Ok(OperationHandle {
        name: name.to_string(),
        cancel,
        handle,
    })
}
