//! cli::host
//!
//! The terminal as a host: progress on stderr, notifications as lines.

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::debug;

use crate::core::types::CommitId;
use crate::host::{Host, NotifyKind};
use crate::ui::output::{self, Verbosity};

/// Prints host callbacks to the terminal.
#[derive(Debug)]
pub struct TerminalHost {
    verbosity: Verbosity,
    /// Last progress caption, to avoid redrawing identical lines.
    last: Mutex<Option<String>>,
}

impl TerminalHost {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            last: Mutex::new(None),
        }
    }

    /// End an in-place progress line before printing anything else.
    fn finish_progress_line(&self) {
        if let Ok(mut last) = self.last.lock() {
            if last.take().is_some() {
                eprintln!();
            }
        }
    }
}

impl Host for TerminalHost {
    fn report_progress(&self, phase: &str, current: u64, max: u64, text: Option<&str>) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let line = output::format_progress(phase, current, max, text);
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if last.as_deref() == Some(line.as_str()) {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K{line}");
        let _ = stderr.flush();
        *last = Some(line);
    }

    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        self.finish_progress_line();
        let text = if message.is_empty() {
            title.to_string()
        } else {
            format!("{title}: {message}")
        };
        match kind {
            NotifyKind::Error => output::error(text),
            NotifyKind::Info => output::print(text, self.verbosity),
            NotifyKind::Success => output::success(text, self.verbosity),
        }
    }

    fn refresh_history(&self, channel_id: &str) {
        debug!(channel = channel_id, "history changed");
    }

    fn prune_history_entries(&self, channel_id: &str, ids: &[CommitId]) {
        for id in ids {
            debug!(channel = channel_id, id = %id.short(7), "history entry rewritten");
        }
    }
}
