//! git::progress
//!
//! Parsing of the tool's progress lines.
//!
//! With `--progress`, the tool writes lines such as
//! `Receiving objects:  42% (21/50), 1.2 MiB | 600 KiB/s` to stderr, redrawing
//! in place with carriage returns. [`parse_progress_line`] turns one such
//! segment into a [`ProgressUpdate`].

use crate::progress::ProgressPhase;

/// One parsed progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: ProgressPhase,
    pub current: u64,
    pub max: u64,
    /// Sub-item name, e.g. the file an LFS download is fetching.
    pub text: Option<String>,
}

impl ProgressUpdate {
    fn new(phase: ProgressPhase, counts: Option<(u64, u64)>) -> Self {
        let (current, max) = counts.unwrap_or((0, 0));
        Self {
            phase,
            current,
            max,
            text: None,
        }
    }
}

const DOWNLOAD_MARKERS: &[&str] = &[
    "Receiving objects",
    "Downloading LFS objects",
    "Filtering content",
];
const UPDATE_MARKERS: &[&str] = &["Updating files", "Checking out files"];
const UPLOAD_MARKERS: &[&str] = &["Writing objects", "Uploading LFS objects"];

/// Lines that are diagnostics rather than progress.
const NOISE_PREFIXES: &[&str] = &["error:", "fatal:", "hint:", "warning:", "CONFLICT"];

/// Parse one progress segment. Returns `None` for blank and diagnostic lines.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let line = line.trim();
    let line = line.strip_prefix("remote:").map(str::trim).unwrap_or(line);
    if line.is_empty() || NOISE_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return None;
    }

    let counts = parse_counts(line);

    if DOWNLOAD_MARKERS.iter().any(|m| line.starts_with(m)) {
        return Some(ProgressUpdate::new(ProgressPhase::Downloading, counts));
    }
    if let Some(item) = lfs_smudge_item(line) {
        let mut update = ProgressUpdate::new(ProgressPhase::Downloading, None);
        update.text = Some(item);
        return Some(update);
    }
    if UPDATE_MARKERS.iter().any(|m| line.starts_with(m)) {
        return Some(ProgressUpdate::new(ProgressPhase::Updating, counts));
    }
    if UPLOAD_MARKERS.iter().any(|m| line.starts_with(m)) {
        return Some(ProgressUpdate::new(ProgressPhase::Uploading, counts));
    }
    Some(ProgressUpdate::new(ProgressPhase::TalkingToServer, None))
}

/// Extract `(current, max)` from a `(12/34)` group.
fn parse_counts(line: &str) -> Option<(u64, u64)> {
    let open = line.find('(')?;
    let rest = &line[open + 1..];
    let close = rest.find(')')?;
    let (current, max) = rest[..close].split_once('/')?;
    let current = current.trim().parse().ok()?;
    let max = max.trim().parse().ok()?;
    Some((current, max))
}

/// The file named by an LFS filter line such as `Downloading scene.ma (12 MB)`.
fn lfs_smudge_item(line: &str) -> Option<String> {
    let rest = line.strip_prefix("Downloading ")?;
    let name = match rest.rfind(" (") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Splits a byte stream into segments on `\r` and `\n`.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every completed segment.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\r' || byte == b'\n' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// The trailing segment without a terminator, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
