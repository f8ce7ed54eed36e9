//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;

use crate::core::types::{Branch, HistoryEntry, HistoryKind, PendingOperation};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// One progress line: `Downloading Files: scene.ma [3/10]`.
pub fn format_progress(phase: &str, current: u64, max: u64, text: Option<&str>) -> String {
    let mut line = match text {
        Some(text) if !text.is_empty() => format!("{phase}: {text}"),
        _ => phase.to_string(),
    };
    if max > 0 {
        line.push_str(&format!(" [{current}/{max}]"));
    }
    line
}

/// `abc1234 2026-01-02 14:00 jane@example.com  message`, remote-only and
/// local-only entries flagged.
pub fn format_history_entry(entry: &HistoryEntry) -> String {
    let marker = match entry.kind {
        HistoryKind::Synced => ' ',
        HistoryKind::LocalOnly => '↑',
        HistoryKind::RemoteOnly => '↓',
    };
    let subject = entry.message.lines().next().unwrap_or_default();
    format!(
        "{} {} {} {}  {}",
        marker,
        entry.id.short(7),
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.author,
        subject
    )
}

pub fn format_branch(branch: &Branch, current: Option<&str>) -> String {
    let marker = if branch.is_local && current == Some(branch.name.as_str()) {
        '*'
    } else {
        ' '
    };
    let id = branch
        .id
        .as_ref()
        .map(|id| id.short(7).to_string())
        .unwrap_or_else(|| "-------".to_string());
    format!("{} {} {}", marker, id, branch.name)
}

pub fn format_pending(pending: &PendingOperation) -> String {
    let mut text = format!("A {} is paused", pending.kind);
    if let Some(head) = &pending.paused_head_ref {
        text.push_str(&format!(" at {}", head.short(7)));
    }
    if !pending.queued_local_commit_ids.is_empty() {
        text.push_str(&format!(
            " ({} local commit(s) being replayed)",
            pending.queued_local_commit_ids.len()
        ));
    }
    text
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CommitId, OperationKind};

    fn id() -> CommitId {
        CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap()
    }

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn progress_line() {
        assert_eq!(
            format_progress("Downloading Files", 3, 10, Some("scene.ma")),
            "Downloading Files: scene.ma [3/10]"
        );
        assert_eq!(format_progress("Talking to Server", 0, 0, None), "Talking to Server");
    }

    #[test]
    fn branch_marks_current() {
        let branch = Branch {
            name: "main".to_string(),
            id: Some(id()),
            last_changed: None,
            is_local: true,
        };
        assert_eq!(format_branch(&branch, Some("main")), "* abc123d main");
        assert_eq!(format_branch(&branch, None), "  abc123d main");
    }

    #[test]
    fn pending_summary() {
        let pending = PendingOperation {
            kind: OperationKind::Rebase,
            paused_head_ref: Some(id()),
            queued_local_commit_ids: vec![id(), id()],
        };
        assert_eq!(
            format_pending(&pending),
            "A rebase is paused at abc123d (2 local commit(s) being replayed)"
        );
    }

    #[test]
    fn list_with_prefix() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }
}
