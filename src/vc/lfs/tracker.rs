//! vc::lfs::tracker
//!
//! The tracked-patterns file (`.gitattributes`).
//!
//! Only lines carrying `filter=lfs` count as tracked. Spaces inside a pattern
//! are written as `[[:space:]]`, the form `git lfs track` produces.

use std::fs;
use std::io::Write;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, info};

use super::LfsError;

const LFS_MARKER: &str = "filter=lfs";
const LFS_ATTRIBUTES: &str = "filter=lfs diff=lfs merge=lfs -text";
const SPACE_CLASS: &str = "[[:space:]]";

/// Escape a pattern for the attributes file.
pub fn escape_pattern(pattern: &str) -> String {
    pattern.replace(' ', SPACE_CLASS)
}

pub fn unescape_pattern(pattern: &str) -> String {
    pattern.replace(SPACE_CLASS, " ")
}

/// Tracked patterns from attributes-file content, unescaped, in file order.
pub fn parse_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| line.split_whitespace().skip(1).any(|attr| attr == LFS_MARKER))
        .filter_map(|line| line.split_whitespace().next())
        .map(unescape_pattern)
        .collect()
}

fn extension_pattern(ext: &str) -> String {
    format!("*.{}", ext.trim_start_matches('.'))
}

/// Membership queries over one read of the attributes file.
#[derive(Debug)]
pub struct ExtensionTracker {
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl ExtensionTracker {
    /// Read `attributes` under `root`. A missing file tracks nothing.
    pub fn load(root: &Path, attributes: &Path) -> Result<Self, LfsError> {
        let content = match fs::read_to_string(attributes) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Self::from_content(root, &content)
    }

    pub fn from_content(root: &Path, content: &str) -> Result<Self, LfsError> {
        let patterns = parse_patterns(content);
        let mut builder = GitignoreBuilder::new(root);
        for pattern in &patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| LfsError::Pattern(e.to_string()))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| LfsError::Pattern(e.to_string()))?;
        Ok(Self { patterns, matcher })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `*.ext` is tracked, case-exact as git matches it. `ext` may
    /// carry a leading dot.
    pub fn is_extension_tracked(&self, ext: &str) -> bool {
        let wanted = extension_pattern(ext);
        self.patterns.iter().any(|p| *p == wanted)
    }

    /// Whether any tracked pattern matches the repository-relative `path`.
    pub fn is_file_tracked(&self, path: &str) -> bool {
        // Outside the working tree
        if Path::new(path).has_root() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, false)
            .is_ignore()
    }
}

/// Append patterns for `extensions` and `paths` not already tracked.
///
/// Returns whether the file changed.
pub fn track(attributes: &Path, extensions: &[String], paths: &[String]) -> Result<bool, LfsError> {
    let existing = match fs::read_to_string(attributes) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let mut known = parse_patterns(&existing);

    let mut additions = String::new();
    let wanted = extensions
        .iter()
        .map(|ext| extension_pattern(ext))
        .chain(paths.iter().cloned());
    for pattern in wanted {
        if pattern.is_empty() || known.contains(&pattern) {
            continue;
        }
        debug!(%pattern, "tracking");
        additions.push_str(&escape_pattern(&pattern));
        additions.push(' ');
        additions.push_str(LFS_ATTRIBUTES);
        additions.push('\n');
        known.push(pattern);
    }

    if additions.is_empty() {
        return Ok(false);
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(attributes)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.write_all(additions.as_bytes())?;
    file.sync_all()?;
    info!(path = %attributes.display(), "updated tracked patterns");
    Ok(true)
}
