//! vc::repository
//!
//! Repository lifecycle and the handle every component borrows.
//!
//! A [`Repository`] is the root of the model: it owns one working copy and
//! hands out short-lived component views ([`ChangeInspector`],
//! [`StagingController`], [`SyncEngine`], [`ConflictResolver`],
//! [`LfsTracker`]). Everything those views return is computed from disk on
//! demand.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::changes::ChangeInspector;
use super::conflicts::ConflictResolver;
use super::lfs::LfsTracker;
use super::staging::StagingController;
use super::sync::SyncEngine;
use crate::core::config::Config;
use crate::core::ops::journal::UpdateJournal;
use crate::core::paths::{RepoPaths, GIT_DIR_NAME};
use crate::core::types::{
    Branch, CommitId, HistoryEntry, HistoryKind, OperationKind, PendingOperation, Stash,
    UpdateState,
};
use crate::git::{Git, GitError, GitRunner, StreamOutcome};
use crate::host::HostContext;
use crate::progress::ProgressSink;

/// Handle to one working copy.
#[derive(Debug)]
pub struct Repository {
    git: Git,
    paths: RepoPaths,
    runner: GitRunner,
    config: Config,
}

impl Repository {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize a new repository at `path`.
    ///
    /// Fails with [`GitError::AlreadyExists`] if `path` already holds one.
    pub fn create(path: &Path, config: &Config) -> Result<Self, GitError> {
        if path.join(GIT_DIR_NAME).exists() {
            return Err(GitError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        fs::create_dir_all(path)?;

        let runner = GitRunner::new(path, config);
        runner.run_checked(["init"])?;
        info!(path = %path.display(), "created repository");

        Self::open(path, config.clone())
    }

    /// Clone `url` into `path`, streaming progress.
    ///
    /// Rejected credentials or an inaccessible remote yield
    /// [`GitError::AuthOrAccess`]; every other failure is reported as
    /// [`GitError::Io`]. A canceled clone removes the directory it created.
    pub fn clone(
        url: &str,
        path: &Path,
        config: &Config,
        progress: &dyn ProgressSink,
    ) -> Result<Self, GitError> {
        if url.starts_with('-') {
            return Err(GitError::InvalidInput(format!("invalid remote url: {url}")));
        }
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let existed = path.exists();

        let runner = GitRunner::new(&parent, config);
        let args: [&OsStr; 5] = [
            OsStr::new("clone"),
            OsStr::new("--progress"),
            OsStr::new("--"),
            OsStr::new(url),
            path.as_os_str(),
        ];
        let outcome = runner.run_streaming(args, progress)?;

        let cleanup = || {
            if !existed && path.exists() {
                let _ = fs::remove_dir_all(path);
            }
        };

        match outcome {
            StreamOutcome::Canceled => {
                cleanup();
                Err(GitError::Canceled)
            }
            StreamOutcome::Finished(output) if output.success => {
                info!(url, path = %path.display(), "cloned repository");
                Self::open(path, config.clone())
            }
            StreamOutcome::Finished(output) => {
                cleanup();
                match GitError::from_command("clone", output.code, &output.stderr) {
                    err @ GitError::AuthOrAccess { .. } => Err(err),
                    other => Err(GitError::Io(std::io::Error::other(other.to_string()))),
                }
            }
        }
    }

    /// Load the repository rooted exactly at `path`.
    ///
    /// Returns `None` if `path` has no repository metadata of its own.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.join(GIT_DIR_NAME).exists() {
            return None;
        }
        let config = match Config::load(Some(&RepoPaths::for_work_dir(path))) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable configuration");
                Config::default()
            }
        };
        match Self::open(path, config) {
            Ok(repo) => Some(repo),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "not loadable");
                None
            }
        }
    }

    /// Open with an explicit configuration.
    pub fn open(path: &Path, config: Config) -> Result<Self, GitError> {
        let git = Git::open_exact(path)?;
        let paths = git.paths()?;
        let runner = GitRunner::new(&paths.work_dir, &config);
        let repo = Self {
            git,
            paths,
            runner,
            config,
        };
        repo.init_lfs();
        Ok(repo)
    }

    /// Whether `path` or any ancestor directory, up to the filesystem root,
    /// contains a repository. Relative paths start from the current directory.
    pub fn is_repo(path: &Path) -> bool {
        let base = std::env::current_dir().unwrap_or_default();
        has_repo_ancestor(&base, path)
    }

    fn init_lfs(&self) {
        match self.runner.run(["lfs", "install", "--local"]) {
            Ok(output) if output.success => debug!("lfs hooks installed"),
            Ok(output) => warn!(stderr = %output.stderr.trim(), "lfs install failed"),
            Err(e) => warn!(error = %e, "lfs install failed"),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    pub fn changes(&self) -> ChangeInspector<'_> {
        ChangeInspector::new(self)
    }

    pub fn staging(&self) -> StagingController<'_> {
        StagingController::new(self)
    }

    pub fn sync<'a>(&'a self, host: &'a HostContext) -> SyncEngine<'a> {
        SyncEngine::new(self, host)
    }

    pub fn conflicts<'a>(&'a self, host: &'a HostContext) -> ConflictResolver<'a> {
        ConflictResolver::new(self, host)
    }

    pub fn lfs(&self) -> LfsTracker<'_> {
        LfsTracker::new(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root_path(&self) -> &Path {
        &self.paths.work_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.paths.git_dir
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn git(&self) -> &Git {
        &self.git
    }

    pub(crate) fn runner(&self) -> &GitRunner {
        &self.runner
    }

    // =========================================================================
    // Remote and branch queries
    // =========================================================================

    pub fn is_unborn(&self) -> bool {
        self.git.is_unborn()
    }

    pub fn current_branch_name(&self) -> Result<Option<String>, GitError> {
        self.git.current_branch()
    }

    /// The remote configured for the current branch, if any.
    pub fn branch_remote(&self) -> Result<Option<String>, GitError> {
        match self.git.current_branch()? {
            Some(branch) => self.git.branch_remote(&branch),
            None => Ok(None),
        }
    }

    /// The branch's remote, else the configured default when that exists.
    pub fn default_remote(&self) -> Result<Option<String>, GitError> {
        if let Some(remote) = self.branch_remote()? {
            return Ok(Some(remote));
        }
        let fallback = self.config.remote();
        Ok(self
            .git
            .remotes()?
            .into_iter()
            .find(|name| name == fallback))
    }

    pub fn has_remote(&self) -> Result<bool, GitError> {
        Ok(!self.git.remotes()?.is_empty())
    }

    pub fn remote_url(&self) -> Result<Option<String>, GitError> {
        match self.default_remote()? {
            Some(remote) => self.git.remote_url(&remote),
            None => Ok(None),
        }
    }

    pub fn branches(&self) -> Result<Vec<Branch>, GitError> {
        self.git.branches()
    }

    pub fn current_change_id(&self) -> Result<Option<CommitId>, GitError> {
        self.git.head_id()
    }

    pub fn remote_change_id(&self) -> Result<Option<CommitId>, GitError> {
        self.git.upstream_id()
    }

    /// The upstream has commits HEAD lacks.
    pub fn is_pull_required(&self) -> Result<bool, GitError> {
        Ok(!self.git.remote_only_ids()?.is_empty())
    }

    /// HEAD has commits the upstream lacks.
    pub fn is_push_required(&self) -> Result<bool, GitError> {
        if self.git.upstream_id()?.is_none() {
            return Ok(false);
        }
        Ok(!self.git.local_only_ids()?.is_empty())
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn get_history(
        &self,
        max_count: Option<usize>,
        skip: usize,
        rev_spec: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, GitError> {
        self.git.history(max_count, skip, rev_spec)
    }

    /// The last commit reachable from `rev` (HEAD by default) touching `path`.
    pub fn get_last_history_entry_for_file(
        &self,
        path: &str,
        rev: Option<&str>,
    ) -> Result<Option<HistoryEntry>, GitError> {
        let info = self
            .git
            .last_commit_touching(path, rev.unwrap_or("HEAD"))?;
        Ok(info.map(|i| i.into_history_entry(HistoryKind::Synced)))
    }

    // =========================================================================
    // Paused operations
    // =========================================================================

    pub fn is_rebasing(&self) -> bool {
        self.paths.rebase_merge_dir().exists() || self.paths.rebase_apply_dir().exists()
    }

    pub fn is_merging(&self) -> bool {
        self.paths.merge_head_path().exists()
    }

    /// The paused merge or rebase, re-derived from the tool's markers.
    ///
    /// A journal left behind without markers is stale and is removed.
    pub fn pending_operation(&self) -> Result<Option<PendingOperation>, GitError> {
        let (kind, head_file) = if self.is_rebasing() {
            (OperationKind::Rebase, self.paths.rebase_head_path())
        } else if self.is_merging() {
            (OperationKind::Merge, self.paths.merge_head_path())
        } else {
            if UpdateJournal::exists(&self.paths) {
                debug!("removing stale update journal");
                UpdateJournal::remove(&self.paths)?;
            }
            return Ok(None);
        };

        let paused_head_ref = fs::read_to_string(&head_file)
            .ok()
            .and_then(|s| s.lines().next().map(str::to_string))
            .and_then(|line| CommitId::new(line).ok());

        let queued_local_commit_ids = match UpdateJournal::read(&self.paths) {
            Ok(journal) => journal.map(|j| j.local_commit_ids).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "unreadable update journal");
                Vec::new()
            }
        };

        Ok(Some(PendingOperation {
            kind,
            paused_head_ref,
            queued_local_commit_ids,
        }))
    }

    // =========================================================================
    // Working tree
    // =========================================================================

    /// Commit the staged set. Returns `false` when nothing was staged.
    pub fn commit(&self, message: &str) -> Result<bool, GitError> {
        if self.git.diff_staged()?.is_empty() {
            info!("nothing to commit");
            return Ok(false);
        }
        self.runner
            .run_checked(["commit", "--no-verify", "-q", "-m", message])?;
        info!("committed staged changes");
        Ok(true)
    }

    /// Discard working-tree changes of `paths`.
    pub fn restore_files(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["checkout".to_string(), "--".to_string()];
        args.extend(paths.iter().cloned());
        self.runner.run_checked(&args)?;
        Ok(())
    }

    pub fn restore_all_files(&self) -> Result<(), GitError> {
        self.runner.run_checked(["checkout", "--", "."])?;
        Ok(())
    }

    // =========================================================================
    // Stashes
    // =========================================================================

    /// Stash local changes. Returns `false` when there was nothing to stash.
    pub fn stash(&self, include_untracked: bool) -> Result<bool, GitError> {
        let mut args = vec!["stash", "push"];
        if include_untracked {
            args.push("--include-untracked");
        }
        let out = self.runner.run_checked(&args)?;
        Ok(!out.contains("No local changes to save"))
    }

    /// Apply and drop a stash (the newest by default).
    ///
    /// A conflicting application leaves the working copy conflicted and
    /// returns [`UpdateState::Conflict`].
    pub fn pop_stash(&self, stash: Option<&Stash>) -> Result<UpdateState, GitError> {
        let mut args = vec!["stash".to_string(), "pop".to_string()];
        if let Some(stash) = stash {
            args.push(stash.id.clone());
        }
        let output = self.runner.run(&args)?;
        if output.success {
            return Ok(UpdateState::Ok);
        }
        if self.git.has_conflicts()? {
            info!("stash application conflicted");
            return Ok(UpdateState::Conflict);
        }
        Err(GitError::from_command("stash", output.code, &output.stderr))
    }

    pub fn drop_stash(&self, stash: &Stash) -> Result<(), GitError> {
        self.runner.run_checked(["stash", "drop", stash.id.as_str()])?;
        Ok(())
    }

    pub fn stashes(&self) -> Result<Vec<Stash>, GitError> {
        let out = self
            .runner
            .run_checked(["stash", "list", "--format=%gd%x00%gs"])?;
        Ok(out.lines().filter_map(parse_stash_line).collect())
    }

    /// The newest stash created on the current branch.
    pub fn get_branch_stash(&self) -> Result<Option<Stash>, GitError> {
        let Some(branch) = self.current_branch_name()? else {
            return Ok(None);
        };
        Ok(self
            .stashes()?
            .into_iter()
            .find(|s| s.branch.as_deref() == Some(branch.as_str())))
    }
}

/// `path` is resolved against `base` unless already absolute.
fn has_repo_ancestor(base: &Path, path: &Path) -> bool {
    base.join(path)
        .ancestors()
        .any(|dir| dir.join(GIT_DIR_NAME).exists())
}

/// Parse `stash@{0}\0On main: message` (or `WIP on main: ...`).
fn parse_stash_line(line: &str) -> Option<Stash> {
    let (id, subject) = line.split_once('\0')?;
    let rest = subject
        .strip_prefix("WIP on ")
        .or_else(|| subject.strip_prefix("On "));
    let (branch, message) = match rest.and_then(|r| r.split_once(": ")) {
        Some((branch, message)) => (Some(branch.to_string()), message.to_string()),
        None => (None, subject.to_string()),
    };
    Some(Stash {
        id: id.to_string(),
        message,
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod stash_lines {
        use super::*;

        #[test]
        fn named_stash() {
            let stash = parse_stash_line("stash@{0}\0On main: before update").unwrap();
            assert_eq!(stash.id, "stash@{0}");
            assert_eq!(stash.branch.as_deref(), Some("main"));
            assert_eq!(stash.message, "before update");
        }

        #[test]
        fn wip_stash() {
            let stash = parse_stash_line("stash@{1}\0WIP on feature: abc1234 last commit").unwrap();
            assert_eq!(stash.branch.as_deref(), Some("feature"));
            assert_eq!(stash.message, "abc1234 last commit");
        }

        #[test]
        fn unknown_subject_keeps_text() {
            let stash = parse_stash_line("stash@{2}\0autostash").unwrap();
            assert_eq!(stash.branch, None);
            assert_eq!(stash.message, "autostash");
        }

        #[test]
        fn missing_separator() {
            assert!(parse_stash_line("garbage").is_none());
        }
    }

    mod probing {
        use super::*;

        #[test]
        fn is_repo_walks_ancestors() {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join(".git")).unwrap();
            let nested = temp.path().join("assets/textures");
            fs::create_dir_all(&nested).unwrap();

            assert!(Repository::is_repo(temp.path()));
            assert!(Repository::is_repo(&nested));
        }

        #[test]
        fn relative_path_walks_past_its_base() {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join(".git")).unwrap();
            let base = temp.path().join("assets");
            fs::create_dir_all(base.join("textures")).unwrap();

            assert!(has_repo_ancestor(&base, Path::new("textures")));
            assert!(has_repo_ancestor(&base, Path::new("textures/new.psd")));
            assert!(Repository::is_repo(&base.join("textures")));

            let outside = TempDir::new().unwrap();
            assert!(!has_repo_ancestor(outside.path(), Path::new("textures")));
        }

        #[test]
        fn is_repo_false_outside() {
            let temp = TempDir::new().unwrap();
            assert!(!Repository::is_repo(temp.path()));
        }

        #[test]
        fn load_requires_exact_root() {
            let temp = TempDir::new().unwrap();
            let repo = Repository::create(temp.path(), &Config::default()).unwrap();
            assert_eq!(
                repo.root_path().canonicalize().unwrap(),
                temp.path().canonicalize().unwrap()
            );

            let sub = temp.path().join("sub");
            fs::create_dir_all(&sub).unwrap();
            assert!(Repository::load(&sub).is_none());
            assert!(Repository::load(temp.path()).is_some());
        }

        #[test]
        fn create_twice_fails() {
            let temp = TempDir::new().unwrap();
            Repository::create(temp.path(), &Config::default()).unwrap();
            assert!(matches!(
                Repository::create(temp.path(), &Config::default()),
                Err(GitError::AlreadyExists { .. })
            ));
        }

        #[test]
        fn fresh_repository_state() {
            let temp = TempDir::new().unwrap();
            let repo = Repository::create(temp.path(), &Config::default()).unwrap();
            assert!(repo.is_unborn());
            assert!(!repo.has_remote().unwrap());
            assert!(!repo.is_pull_required().unwrap());
            assert!(!repo.is_push_required().unwrap());
            assert!(repo.pending_operation().unwrap().is_none());
        }

        #[test]
        fn stale_journal_is_discarded() {
            let temp = TempDir::new().unwrap();
            let repo = Repository::create(temp.path(), &Config::default()).unwrap();
            UpdateJournal::new(OperationKind::Rebase, Vec::new())
                .write(repo.paths())
                .unwrap();

            assert!(repo.pending_operation().unwrap().is_none());
            assert!(!UpdateJournal::exists(repo.paths()));
        }
    }
}
