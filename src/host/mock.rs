//! host::mock
//!
//! Recording host for deterministic testing.
//!
//! Every callback is appended to an in-memory event log that tests inspect
//! afterwards. Thread-safe, so it can be shared with background workers.

use std::sync::{Arc, Mutex};

use super::{Host, NotifyKind};
use crate::core::types::CommitId;
use crate::progress::CancelFlag;

/// Recorded host callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Progress {
        phase: String,
        current: u64,
        max: u64,
        text: Option<String>,
    },
    Notify {
        kind: NotifyKind,
        title: String,
        message: String,
    },
    Refresh {
        channel_id: String,
    },
    Prune {
        channel_id: String,
        ids: Vec<CommitId>,
    },
}

/// Host that records every callback.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
    /// Set after this many progress reports, to simulate a user cancel.
    cancel_after: Option<(usize, CancelFlag)>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip `flag` once `reports` progress updates have been received.
    pub fn canceling_after(reports: usize, flag: CancelFlag) -> Self {
        Self {
            events: Arc::default(),
            cancel_after: Some((reports, flag)),
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().clone()
    }

    /// `(kind, title, message)` of every notification.
    pub fn notifications(&self) -> Vec<(NotifyKind, String, String)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Notify {
                    kind,
                    title,
                    message,
                } => Some((*kind, title.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    /// All ids pruned so far, in order.
    pub fn pruned_ids(&self) -> Vec<CommitId> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Prune { ids, .. } => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, HostEvent::Refresh { .. }))
            .count()
    }

    pub fn progress_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, HostEvent::Progress { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HostEvent>> {
        // A panicking test thread must not hide the events from the others
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Host for RecordingHost {
    fn report_progress(&self, phase: &str, current: u64, max: u64, text: Option<&str>) {
        let count = {
            let mut events = self.lock();
            events.push(HostEvent::Progress {
                phase: phase.to_string(),
                current,
                max,
                text: text.map(str::to_string),
            });
            events
                .iter()
                .filter(|e| matches!(e, HostEvent::Progress { .. }))
                .count()
        };
        if let Some((after, flag)) = &self.cancel_after {
            if count >= *after {
                flag.cancel();
            }
        }
    }

    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        self.lock().push(HostEvent::Notify {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn refresh_history(&self, channel_id: &str) {
        self.lock().push(HostEvent::Refresh {
            channel_id: channel_id.to_string(),
        });
    }

    fn prune_history_entries(&self, channel_id: &str, ids: &[CommitId]) {
        self.lock().push(HostEvent::Prune {
            channel_id: channel_id.to_string(),
            ids: ids.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let host = RecordingHost::new();
        host.refresh_history("Git");
        host.notify(NotifyKind::Info, "t", "m");
        let events = host.events();
        assert!(matches!(events[0], HostEvent::Refresh { .. }));
        assert!(matches!(events[1], HostEvent::Notify { .. }));
        assert_eq!(host.refresh_count(), 1);
    }

    #[test]
    fn cancels_after_threshold() {
        let flag = CancelFlag::new();
        let host = RecordingHost::canceling_after(2, flag.clone());
        host.report_progress("downloading", 1, 4, None);
        assert!(!flag.is_canceled());
        host.report_progress("downloading", 2, 4, None);
        assert!(flag.is_canceled());
    }

    #[test]
    fn pruned_ids_flatten() {
        let host = RecordingHost::new();
        let a = CommitId::new("a".repeat(40)).unwrap();
        let b = CommitId::new("b".repeat(40)).unwrap();
        host.prune_history_entries("Git", &[a.clone()]);
        host.prune_history_entries("Git", &[b.clone()]);
        assert_eq!(host.pruned_ids(), vec![a, b]);
    }
}
