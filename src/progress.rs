//! progress
//!
//! Progress reporting and cooperative cancellation.
//!
//! A [`ProgressSink`] receives `(phase, current, max, text)` updates in the
//! order the external tool emits them. Cancellation is polled once per output
//! line; when [`ProgressSink::is_canceled`] turns true the running process is
//! killed and the operation returns a canceled outcome.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Phase reported by a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Receiving objects or LFS content.
    Downloading,
    /// Writing to the working tree.
    Updating,
    /// Sending objects or LFS content.
    Uploading,
    /// Counting, compressing, resolving, negotiating.
    TalkingToServer,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Downloading => "downloading",
            ProgressPhase::Updating => "updating",
            ProgressPhase::Uploading => "writing",
            ProgressPhase::TalkingToServer => "talking",
        }
    }

    /// Whether `current/max` is meaningful in this phase.
    pub fn is_determinate(&self) -> bool {
        !matches!(self, ProgressPhase::TalkingToServer)
    }
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer of progress updates.
pub trait ProgressSink: Send + Sync {
    /// Report progress. `max` is zero for indeterminate phases.
    fn update(&self, phase: ProgressPhase, current: u64, max: u64, text: Option<&str>);

    /// Polled between output lines.
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A sink that ignores updates and is never canceled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _: ProgressPhase, _: u64, _: u64, _: Option<&str>) {}
}

/// Shared cancellation flag, set from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
