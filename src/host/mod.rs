//! host
//!
//! The contract with the surrounding application.
//!
//! # Design
//!
//! The host renders progress, shows notifications, and owns the history view
//! ("channel") for each repository. These four callbacks are the entire
//! contract; nothing else about the host is assumed. A [`HostContext`] binds a
//! host to one channel and is resolved once when a component is constructed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vcbridge::host::{HostContext, NotifyKind};
//! use vcbridge::host::mock::RecordingHost;
//!
//! let host = Arc::new(RecordingHost::new());
//! let ctx = HostContext::new(host.clone(), "Git");
//! ctx.notify(NotifyKind::Success, "Update Successful", "");
//! assert_eq!(host.notifications().len(), 1);
//! ```

pub mod mock;

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::core::types::{CommitId, SyncFailure};
use crate::progress::{CancelFlag, ProgressPhase, ProgressSink};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyKind::Info => f.write_str("info"),
            NotifyKind::Success => f.write_str("success"),
            NotifyKind::Error => f.write_str("error"),
        }
    }
}

/// Callbacks implemented by the host application.
pub trait Host: Send + Sync {
    fn report_progress(&self, phase: &str, current: u64, max: u64, text: Option<&str>);

    fn notify(&self, kind: NotifyKind, title: &str, message: &str);

    /// Re-read the history view of a channel.
    fn refresh_history(&self, channel_id: &str);

    /// Remove entries that no longer exist (rewritten by a rebase, or
    /// transient "in progress" markers).
    fn prune_history_entries(&self, channel_id: &str, ids: &[CommitId]);
}

/// A host bound to one history channel.
#[derive(Clone)]
pub struct HostContext {
    host: Arc<dyn Host>,
    channel_id: String,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

impl HostContext {
    pub fn new(host: Arc<dyn Host>, channel_id: impl Into<String>) -> Self {
        Self {
            host,
            channel_id: channel_id.into(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        match kind {
            NotifyKind::Error => error!(title, message, "notify"),
            _ => info!(%kind, title, message, "notify"),
        }
        self.host.notify(kind, title, message);
    }

    /// Surface a sync failure with the severity its tier demands.
    pub fn notify_failure(&self, failure: &SyncFailure) {
        let kind = if failure.is_informational() {
            NotifyKind::Info
        } else {
            NotifyKind::Error
        };
        self.notify(kind, failure.title(), &failure.message());
    }

    pub fn refresh_history(&self) {
        self.host.refresh_history(&self.channel_id);
    }

    pub fn prune_history(&self, ids: &[CommitId]) {
        if ids.is_empty() {
            return;
        }
        info!(channel = %self.channel_id, count = ids.len(), "pruning history entries");
        self.host.prune_history_entries(&self.channel_id, ids);
    }

    /// A progress sink forwarding to this host.
    pub fn progress(&self, cancel: CancelFlag) -> HostProgress {
        HostProgress {
            host: Arc::clone(&self.host),
            cancel,
        }
    }
}

/// Adapter turning tool progress into host-facing text.
pub struct HostProgress {
    host: Arc<dyn Host>,
    cancel: CancelFlag,
}

impl HostProgress {
    /// Host-facing caption for a phase.
    pub fn caption(phase: ProgressPhase, text: Option<&str>) -> String {
        match (phase, text) {
            (ProgressPhase::Downloading, Some(item)) => format!("Downloading Files: {}", item),
            (ProgressPhase::Downloading, None) => "Downloading Files".to_string(),
            (ProgressPhase::Uploading, Some(item)) => format!("Uploading Files: {}", item),
            (ProgressPhase::Uploading, None) => "Uploading Files".to_string(),
            (ProgressPhase::Updating, _) => "Updating Files".to_string(),
            (ProgressPhase::TalkingToServer, _) => "Talking to Server".to_string(),
        }
    }
}

impl ProgressSink for HostProgress {
    fn update(&self, phase: ProgressPhase, current: u64, max: u64, text: Option<&str>) {
        let caption = Self::caption(phase, text);
        if phase.is_determinate() {
            self.host
                .report_progress(phase.as_str(), current, max, Some(&caption));
        } else {
            self.host.report_progress(phase.as_str(), 0, 0, Some(&caption));
        }
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}
