//! vc::lfs
//!
//! Large-file tracking: which files become pointers, which may be locked,
//! and where their content lives locally.
//!
//! # Policy
//!
//! - A file is binary by [`classify`](classify::classify); binaries with an
//!   extension are tracked as `*.ext`, extensionless ones by explicit path
//! - Lockable means tracked (by pattern) or listed in the repository's
//!   `lock_extensions`; the two sources are independent
//! - The attributes file is re-read on every query
//! - Pruning only removes cached objects that are already pushed

mod cache;
mod classify;
mod tracker;

pub use cache::{parse_conflicting_pointer, parse_pointer, verify_object, LfsPointer};
pub use classify::{classify, is_binary, sniff, Classification, Reason};
pub use tracker::{escape_pattern, parse_patterns, unescape_pattern, ExtensionTracker};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::repository::Repository;
use crate::core::types::Change;
use crate::git::GitError;
use crate::host::{HostContext, NotifyKind};

/// Errors from large-file operations.
#[derive(Debug, Error)]
pub enum LfsError {
    #[error("invalid tracking pattern: {0}")]
    Pattern(String),

    #[error("walking the working tree failed: {0}")]
    Walk(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of scanning candidate files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryScan {
    /// Binary files without an extension.
    pub path_set: BTreeSet<String>,
    /// Extensions (as spelled on disk, no dot) of binary files.
    pub extension_set: BTreeSet<String>,
    pub canceled: bool,
}

/// Per-item scan callback: `(index, total, path)`. Returning `false` stops
/// the scan.
pub type ScanProgress<'p> = &'p mut dyn FnMut(usize, usize, &Path) -> bool;

/// Large-file operations for one repository.
#[derive(Debug, Clone, Copy)]
pub struct LfsTracker<'a> {
    repo: &'a Repository,
}

impl<'a> LfsTracker<'a> {
    pub(crate) fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    pub fn is_binary(&self, path: &Path) -> bool {
        is_binary(&self.absolute(path))
    }

    /// Group binary files among `paths` by extension.
    pub fn collect_binaries(
        &self,
        paths: &[PathBuf],
        mut progress: Option<ScanProgress<'_>>,
    ) -> BinaryScan {
        let mut scan = BinaryScan::default();
        let total = paths.len();
        for (index, path) in paths.iter().enumerate() {
            if let Some(callback) = progress.as_mut() {
                if !callback(index, total, path) {
                    info!(scanned = index, total, "binary scan canceled");
                    scan.canceled = true;
                    break;
                }
            }
            let absolute = self.absolute(path);
            if !absolute.is_file() || !is_binary(&absolute) {
                continue;
            }
            match absolute.extension().and_then(|e| e.to_str()) {
                Some(ext) if !ext.is_empty() => {
                    // Attribute patterns match case-sensitively
                    scan.extension_set.insert(ext.to_string());
                }
                _ => {
                    scan.path_set.insert(self.repo.paths().relative(&absolute));
                }
            }
        }
        scan
    }

    /// Track `extensions` and explicit `paths`. Returns whether the
    /// attributes file changed; the caller stages it.
    pub fn track(&self, extensions: &[String], paths: &[String]) -> Result<bool, LfsError> {
        tracker::track(&self.repo.paths().attributes_path(), extensions, paths)
    }

    /// Classify `paths`, track every binary found, and stage the attributes
    /// file if it changed.
    pub fn track_binaries(
        &self,
        paths: &[PathBuf],
        progress: Option<ScanProgress<'_>>,
    ) -> Result<BinaryScan, LfsError> {
        let scan = self.collect_binaries(paths, progress);
        if scan.canceled {
            return Ok(scan);
        }
        let extensions: Vec<String> = scan.extension_set.iter().cloned().collect();
        let explicit: Vec<String> = scan.path_set.iter().cloned().collect();
        if self.track(&extensions, &explicit)? {
            let attributes = self.repo.paths().attributes_path();
            let rel = self.repo.paths().relative(&attributes);
            self.repo.staging().stage(&[rel])?;
        }
        Ok(scan)
    }

    /// Walk the working tree under `root` (the repository root by default),
    /// honoring ignore files, and track every binary found.
    pub fn track_all_binaries(
        &self,
        root: Option<&Path>,
        progress: Option<ScanProgress<'_>>,
    ) -> Result<BinaryScan, LfsError> {
        let root = root
            .map(|r| self.absolute(r))
            .unwrap_or_else(|| self.repo.root_path().to_path_buf());

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();
        for entry in walker {
            let entry = entry.map_err(|e| LfsError::Walk(e.to_string()))?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        debug!(root = %root.display(), count = files.len(), "scanning working tree");
        self.track_binaries(&files, progress)
    }

    /// A fresh view of the tracked patterns.
    pub fn extension_tracker(&self) -> Result<ExtensionTracker, LfsError> {
        ExtensionTracker::load(self.repo.root_path(), &self.repo.paths().attributes_path())
    }

    /// Whether `path` may take a binary lock.
    ///
    /// Configured lock extensions compare case-insensitively; tracked
    /// patterns match the way the attributes file does, case-exact.
    pub fn is_lockable(&self, path: &Path) -> Result<bool, LfsError> {
        let rel = self.repo.paths().relative(path);
        let ext = Path::new(&rel).extension().and_then(|e| e.to_str());

        if let Some(ext) = ext {
            if self
                .repo
                .config()
                .lock_extensions()
                .contains(&ext.to_ascii_lowercase())
            {
                return Ok(true);
            }
        }
        let tracker = self.extension_tracker()?;
        Ok(ext.is_some_and(|e| tracker.is_extension_tracked(e)) || tracker.is_file_tracked(&rel))
    }

    /// The pointer stored for `path` at `rev`, if that blob is one.
    pub fn pointer_at(&self, rev: &str, path: &str) -> Result<Option<LfsPointer>, LfsError> {
        Ok(self
            .repo
            .git()
            .blob_at(rev, path)?
            .and_then(|blob| parse_pointer(&blob)))
    }

    /// Local cache path of the content `path` had at `rev`, fetching the
    /// object on a miss.
    ///
    /// A file absent at `rev` resolves from the commit before the one that
    /// last touched it.
    pub fn cached_object(&self, path: &Path, rev: &str) -> Result<Option<PathBuf>, LfsError> {
        let rel = self.repo.paths().relative(path);
        let (pointer, at) = match self.pointer_at(rev, &rel)? {
            Some(pointer) => (pointer, rev.to_string()),
            None => {
                let info = match self.repo.git().last_commit_touching(&rel, rev) {
                    Ok(Some(info)) => info,
                    Ok(None) => return Ok(None),
                    Err(e) => {
                        debug!(%rev, error = %e, "revision not resolvable");
                        return Ok(None);
                    }
                };
                let parent = format!("{}^", info.id);
                match self.pointer_at(&parent, &rel)? {
                    Some(pointer) => (pointer, parent),
                    None => return Ok(None),
                }
            }
        };
        self.object_for(&pointer, &rel, &at)
    }

    fn object_for(
        &self,
        pointer: &LfsPointer,
        rel: &str,
        rev: &str,
    ) -> Result<Option<PathBuf>, LfsError> {
        let Some(object) = self.repo.paths().lfs_object_path(&pointer.oid) else {
            return Ok(None);
        };
        if object.is_file() {
            return Ok(Some(object));
        }

        let Some(remote) = self.repo.default_remote()? else {
            debug!(oid = %pointer.oid, "object missing and no remote to fetch from");
            return Ok(None);
        };
        let include = format!("--include={rel}");
        let output = self
            .repo
            .runner()
            .run(["lfs", "fetch", remote.as_str(), rev, include.as_str()])?;
        if !output.success {
            warn!(oid = %pointer.oid, stderr = %output.stderr.trim(), "lfs fetch failed");
        }
        Ok(object.is_file().then_some(object))
    }

    /// Map each path to its cached object at `rev` (HEAD by default).
    pub fn load_files(&self, paths: &[PathBuf], rev: Option<&str>) -> Result<Vec<Change>, LfsError> {
        let rev = rev.unwrap_or("HEAD");
        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let mut change = Change::new(self.repo.paths().relative(path));
            change.cached_path = self
                .cached_object(path, rev)?
                .map(|p| p.to_string_lossy().into_owned());
            loaded.push(change);
        }
        Ok(loaded)
    }

    /// Delete cached objects the server already has.
    ///
    /// `recent_days` keeps objects referenced by commits from the last N
    /// days; `force` drops everything not needed by unpushed commits.
    /// Returns how many objects were deleted.
    pub fn prune(&self, recent_days: Option<u32>, force: bool) -> Result<usize, LfsError> {
        let args = prune_args(recent_days, force);
        let output = self.repo.runner().run(&args)?;
        if !output.success {
            return Err(GitError::from_command("lfs", output.code, &output.stderr).into());
        }
        let count = pruned_count(&output.stdout).max(pruned_count(&output.stderr));
        info!(count, ?recent_days, force, "pruned cached objects");
        Ok(count)
    }

    /// Prune with default retention and tell the host what happened.
    pub fn clear_cache(&self, host: &HostContext) -> Result<usize, LfsError> {
        let count = self.prune(None, false)?;
        if count == 0 {
            host.notify(NotifyKind::Info, "Cache is already cleared", "");
        } else {
            host.notify(NotifyKind::Info, "Cache cleared", &format!("Cleared {count} objects"));
        }
        Ok(count)
    }

    /// Whether the cached object for `pointer` is present and intact.
    pub fn verify_cached(&self, pointer: &LfsPointer) -> Result<bool, LfsError> {
        match self.repo.paths().lfs_object_path(&pointer.oid) {
            Some(object) if object.is_file() => Ok(verify_object(&object, &pointer.oid)?),
            _ => Ok(false),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo.root_path().join(path)
        }
    }
}

fn prune_args(recent_days: Option<u32>, force: bool) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(days) = recent_days {
        for key in ["lfs.fetchrecentcommitsdays", "lfs.fetchrecentrefsdays"] {
            args.push("-c".to_string());
            args.push(format!("{key}={days}"));
        }
        args.push("-c".to_string());
        args.push("lfs.pruneoffsetdays=0".to_string());
    }
    args.push("lfs".to_string());
    args.push("prune".to_string());
    if force {
        args.push("--force".to_string());
    }
    args
}

/// Objects deleted, from `prune: Deleting objects: 100% (3/3), done.`
fn pruned_count(text: &str) -> usize {
    text.split(['\r', '\n'])
        .filter(|line| line.contains("Deleting objects"))
        .filter_map(|line| {
            let group = &line[line.rfind('(')? + 1..];
            let group = &group[..group.find(')')?];
            group.split_once('/')?.1.trim().parse::<usize>().ok()
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, RepoConfig};
    use std::fs;
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> Repository {
        Repository::create(dir.path(), &Config::default()).unwrap()
    }

    mod scanning {
        use super::*;

        #[test]
        fn groups_by_extension() {
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            fs::write(dir.path().join("a.psd"), [0u8, 1, 2]).unwrap();
            fs::write(dir.path().join("b.PSD"), [0u8, 3]).unwrap();
            fs::write(dir.path().join("blob"), [0u8, 9]).unwrap();
            fs::write(dir.path().join("readme.md"), "hi").unwrap();

            let paths: Vec<PathBuf> = ["a.psd", "b.PSD", "blob", "readme.md"]
                .iter()
                .map(PathBuf::from)
                .collect();
            let scan = repo.lfs().collect_binaries(&paths, None);

            assert!(!scan.canceled);
            assert_eq!(
                scan.extension_set.into_iter().collect::<Vec<_>>(),
                vec!["PSD", "psd"]
            );
            assert_eq!(scan.path_set.into_iter().collect::<Vec<_>>(), vec!["blob"]);
        }

        #[test]
        fn callback_cancels() {
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            fs::write(dir.path().join("a.bin"), [0u8]).unwrap();
            fs::write(dir.path().join("b.bin"), [0u8]).unwrap();

            let mut seen = 0;
            let mut stop_after_first = |index: usize, _total: usize, _path: &Path| {
                seen += 1;
                index == 0
            };
            let paths = vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")];
            let scan = repo
                .lfs()
                .collect_binaries(&paths, Some(&mut stop_after_first));

            assert!(scan.canceled);
            assert_eq!(seen, 2);
        }

        #[test]
        fn walk_skips_metadata_dir() {
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            fs::create_dir_all(dir.path().join("art")).unwrap();
            fs::write(dir.path().join("art/hero.psd"), [0u8, 1]).unwrap();

            let scan = repo.lfs().track_all_binaries(None, None).unwrap();

            assert_eq!(scan.extension_set.into_iter().collect::<Vec<_>>(), vec!["psd"]);
            assert!(scan.path_set.is_empty());
            let tracker = repo.lfs().extension_tracker().unwrap();
            assert!(tracker.is_extension_tracked("psd"));
        }
    }

    mod locking {
        use super::*;

        #[test]
        fn tracked_or_configured() {
            let dir = TempDir::new().unwrap();
            let created = repo(&dir);
            Config::write_repo(
                created.paths(),
                &RepoConfig {
                    lock_extensions: vec!["ma".to_string()],
                    ..RepoConfig::default()
                },
            )
            .unwrap();
            let repo = Repository::load(dir.path()).unwrap();
            repo.lfs().track(&["psd".to_string()], &[]).unwrap();

            assert!(repo.lfs().is_lockable(Path::new("hero.psd")).unwrap());
            assert!(!repo.lfs().is_lockable(Path::new("hero.PSD")).unwrap());
            assert!(repo.lfs().is_lockable(Path::new("scenes/shot.ma")).unwrap());
            assert!(repo.lfs().is_lockable(Path::new("scenes/shot.MA")).unwrap());
            assert!(!repo.lfs().is_lockable(Path::new("notes.txt")).unwrap());
        }
    }

    mod pruning {
        use super::*;
        use crate::git::command_exists;
        use crate::host::mock::RecordingHost;
        use std::sync::Arc;

        #[test]
        fn args_per_mode() {
            assert_eq!(prune_args(None, false), vec!["lfs", "prune"]);
            assert_eq!(prune_args(None, true), vec!["lfs", "prune", "--force"]);
            let recent = prune_args(Some(7), false);
            assert!(recent.contains(&"lfs.fetchrecentcommitsdays=7".to_string()));
            assert!(recent.contains(&"lfs.pruneoffsetdays=0".to_string()));
            assert_eq!(&recent[recent.len() - 2..], ["lfs", "prune"]);
        }

        #[test]
        fn count_from_output() {
            let out = "prune: 6 local objects, 4 retained, done.\nprune: Deleting objects: 50% (1/2)\rprune: Deleting objects: 100% (2/2), done.\n";
            assert_eq!(pruned_count(out), 2);
            assert_eq!(pruned_count("prune: 3 local objects, 3 retained, done.\n"), 0);
            assert_eq!(pruned_count(""), 0);
        }

        #[test]
        fn empty_cache_is_informational() {
            if !command_exists("git-lfs") {
                return;
            }
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            fs::write(dir.path().join("scene.ma"), "scene\n").unwrap();
            for args in [
                &["add", "scene.ma"][..],
                &["-c", "user.name=Test", "-c", "user.email=t@example.com", "commit", "-q", "-m", "init"],
            ] {
                let status = std::process::Command::new("git")
                    .args(args)
                    .current_dir(dir.path())
                    .status()
                    .unwrap();
                assert!(status.success());
            }
            let host = Arc::new(RecordingHost::new());
            let ctx = HostContext::new(host.clone(), "Git");

            assert_eq!(repo.lfs().clear_cache(&ctx).unwrap(), 0);
            let notes = host.notifications();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].0, NotifyKind::Info);
            assert_eq!(notes[0].1, "Cache is already cleared");
        }
    }

    mod objects {
        use super::*;

        #[test]
        fn cached_object_found_without_fetch() {
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            let oid = "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";
            let object = repo.paths().lfs_object_path(oid).unwrap();
            fs::create_dir_all(object.parent().unwrap()).unwrap();
            fs::write(&object, b"foo").unwrap();

            let pointer = LfsPointer {
                oid: oid.to_string(),
                size: 3,
            };
            assert_eq!(
                repo.lfs().object_for(&pointer, "x.bin", "HEAD").unwrap(),
                Some(object)
            );
            assert!(repo.lfs().verify_cached(&pointer).unwrap());
        }

        #[test]
        fn unborn_file_resolves_nothing() {
            let dir = TempDir::new().unwrap();
            let repo = repo(&dir);
            assert!(repo.lfs().pointer_at("HEAD", "x.bin").unwrap().is_none());
        }
    }
}
