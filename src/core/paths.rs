//! core::paths
//!
//! Centralized path routing for repository storage locations.
//!
//! # Storage Layout
//!
//! Bridge-owned data lives under `<git_dir>/vcbridge/`:
//! - `config.toml` - Repository configuration
//! - `lock` - Exclusive operation lock
//! - `pending.json` - Local commits queued by a paused update
//!
//! Tool-owned locations that are read (never written) here:
//! - `<git_dir>/rebase-merge/`, `<git_dir>/rebase-apply/` - rebase markers
//! - `<git_dir>/MERGE_HEAD`, `<git_dir>/REBASE_HEAD` - paused heads
//! - `<git_dir>/lfs/objects/<aa>/<bb>/<hash>` - cached LFS objects
//!
//! # Example
//!
//! ```
//! use vcbridge::core::paths::RepoPaths;
//! use std::path::PathBuf;
//!
//! let paths = RepoPaths::new(PathBuf::from("/repo"), PathBuf::from("/repo/.git"));
//! assert_eq!(paths.lock_path(), PathBuf::from("/repo/.git/vcbridge/lock"));
//! assert_eq!(
//!     paths.lfs_object_path("abcdef"),
//!     Some(PathBuf::from("/repo/.git/lfs/objects/ab/cd/abcdef"))
//! );
//! ```

use std::path::{Path, PathBuf};

/// Name of the repository marker directory.
pub const GIT_DIR_NAME: &str = ".git";

/// Name of the tracked-patterns file at the repository root.
pub const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Centralized path routing for one working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    /// Root of the working tree.
    pub work_dir: PathBuf,
    /// The tool's metadata directory.
    pub git_dir: PathBuf,
}

impl RepoPaths {
    pub fn new(work_dir: PathBuf, git_dir: PathBuf) -> Self {
        Self { work_dir, git_dir }
    }

    /// Paths for a conventional layout (`<work_dir>/.git`).
    pub fn for_work_dir(work_dir: &Path) -> Self {
        Self::new(work_dir.to_path_buf(), work_dir.join(GIT_DIR_NAME))
    }

    // =========================================================================
    // Bridge-owned paths
    // =========================================================================

    pub fn bridge_dir(&self) -> PathBuf {
        self.git_dir.join("vcbridge")
    }

    pub fn config_path(&self) -> PathBuf {
        self.bridge_dir().join("config.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.bridge_dir().join("lock")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.bridge_dir().join("pending.json")
    }

    // =========================================================================
    // Tool-owned paths
    // =========================================================================

    pub fn attributes_path(&self) -> PathBuf {
        self.work_dir.join(ATTRIBUTES_FILE)
    }

    pub fn rebase_merge_dir(&self) -> PathBuf {
        self.git_dir.join("rebase-merge")
    }

    pub fn rebase_apply_dir(&self) -> PathBuf {
        self.git_dir.join("rebase-apply")
    }

    pub fn merge_head_path(&self) -> PathBuf {
        self.git_dir.join("MERGE_HEAD")
    }

    pub fn rebase_head_path(&self) -> PathBuf {
        self.git_dir.join("REBASE_HEAD")
    }

    pub fn lfs_objects_dir(&self) -> PathBuf {
        self.git_dir.join("lfs").join("objects")
    }

    /// Location of a cached LFS object, sharded by the first two byte pairs.
    ///
    /// Returns `None` for hashes shorter than four characters.
    pub fn lfs_object_path(&self, hash: &str) -> Option<PathBuf> {
        if hash.len() < 4 || !hash.is_char_boundary(2) || !hash.is_char_boundary(4) {
            return None;
        }
        Some(
            self.lfs_objects_dir()
                .join(&hash[..2])
                .join(&hash[2..4])
                .join(hash),
        )
    }

    /// Express `path` relative to the working tree, with `/` separators.
    ///
    /// Relative inputs are returned normalized; absolute paths outside the
    /// working tree are returned unchanged.
    pub fn relative(&self, path: &Path) -> String {
        let rel = if path.is_absolute() {
            match path.strip_prefix(&self.work_dir) {
                Ok(rel) => rel.to_path_buf(),
                // Tolerate symlinked roots (/var vs /private/var)
                Err(_) => self
                    .canonical_relative(path)
                    .unwrap_or_else(|| path.to_path_buf()),
            }
        } else {
            path.to_path_buf()
        };
        normalize_separators(&rel.to_string_lossy())
    }

    fn canonical_relative(&self, path: &Path) -> Option<PathBuf> {
        let root = self.work_dir.canonicalize().ok()?;
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            // Deleted files cannot be canonicalized; resolve the parent instead
            Err(_) => path.parent()?.canonicalize().ok()?.join(path.file_name()?),
        };
        canonical.strip_prefix(&root).ok().map(Path::to_path_buf)
    }
}

/// Convert `\` to `/` and strip a leading `./`.
pub fn normalize_separators(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(replaced)
}
