//! git::interface
//!
//! Read-only repository queries through git2.
//!
//! Every query re-reads the on-disk state: the index is reloaded before
//! conflict checks, and nothing is memoized between calls, because the tool
//! (or the user) may change the repository underneath at any time.
//!
//! # Example
//!
//! ```ignore
//! use vcbridge::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! if git.state().is_in_progress() {
//!     println!("paused: {}", git.state());
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use super::error::GitError;
use crate::core::paths::{normalize_separators, RepoPaths};
use crate::core::types::{Branch, ChangeKind, CommitId, HistoryEntry, HistoryKind};

/// State of in-progress tool operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Merge,
    Rebase {
        current: Option<usize>,
        total: Option<usize>,
    },
    /// Cherry-pick, revert, bisect, apply-mailbox.
    Other(&'static str),
}

impl GitState {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Merge => "merge",
            GitState::Rebase { .. } => "rebase",
            GitState::Other(name) => name,
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => f.write_str(self.description()),
        }
    }
}

/// One file difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDelta {
    pub kind: ChangeKind,
    pub path: String,
    pub old_path: Option<String>,
}

/// An unmerged index entry and which stages are present.
///
/// Stage 2 is the tool's "ours", stage 3 its "theirs". A missing stage means
/// that side deleted the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    pub path: String,
    pub has_base: bool,
    pub has_ours: bool,
    pub has_theirs: bool,
}

impl ConflictEntry {
    /// Deleted on the tool's "ours" side (`DU`).
    pub fn deleted_by_ours(&self) -> bool {
        !self.has_ours && self.has_theirs
    }

    /// Deleted on the tool's "theirs" side (`UD`).
    pub fn deleted_by_theirs(&self) -> bool {
        self.has_ours && !self.has_theirs
    }
}

/// Metadata of one commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub time: DateTime<Utc>,
    pub parents: Vec<CommitId>,
}

impl CommitInfo {
    pub fn into_history_entry(self, kind: HistoryKind) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            author: self.author_email,
            message: self.message,
            timestamp: self.time,
            kind,
            parents: self.parents,
        }
    }
}

/// Read access to one working copy.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Open the repository containing `path`, searching parent directories.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Self::from_repo(repo)
    }

    /// Open the repository rooted exactly at `path`.
    pub fn open_exact(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open_ext(
            path,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Self::from_repo(repo)
    }

    fn from_repo(repo: git2::Repository) -> Result<Self, GitError> {
        if repo.is_bare() {
            return Err(GitError::NotARepo {
                path: repo.path().to_path_buf(),
            });
        }
        Ok(Self { repo })
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::NotARepo {
            path: self.repo.path().to_path_buf(),
        })
    }

    pub fn paths(&self) -> Result<RepoPaths, GitError> {
        Ok(RepoPaths::new(
            self.work_dir()?.to_path_buf(),
            self.git_dir().to_path_buf(),
        ))
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge
            | git2::RepositoryState::ApplyMailboxOrRebase => {
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::Other("cherry-pick")
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Other("revert")
            }
            git2::RepositoryState::Bisect => GitState::Other("bisect"),
            git2::RepositoryState::ApplyMailbox => GitState::Other("apply-mailbox"),
        }
    }

    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let read_num = |path: std::path::PathBuf| {
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| s.trim().parse().ok())
        };
        let git_dir = self.repo.path();
        let merge = git_dir.join("rebase-merge");
        if merge.exists() {
            return (read_num(merge.join("msgnum")), read_num(merge.join("end")));
        }
        let apply = git_dir.join("rebase-apply");
        if apply.exists() {
            return (read_num(apply.join("next")), read_num(apply.join("last")));
        }
        (None, None)
    }

    /// Whether HEAD points at a branch with no commits yet.
    pub fn is_unborn(&self) -> bool {
        match self.repo.head() {
            Ok(head) => head.peel_to_commit().is_err(),
            Err(_) => true,
        }
    }

    pub fn head_id(&self) -> Result<Option<CommitId>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(head.peel_to_commit().ok().map(|c| c.id().into())),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Current branch name, `None` when detached.
    ///
    /// An unborn branch still has a name.
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let target = self
                    .repo
                    .find_reference("HEAD")?
                    .symbolic_target()
                    .map(|t| t.trim_start_matches("refs/heads/").to_string());
                Ok(target)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The remote configured for `branch` (`branch.<name>.remote`).
    pub fn branch_remote(&self, branch: &str) -> Result<Option<String>, GitError> {
        let config = self.repo.config()?;
        match config.get_string(&format!("branch.{}.remote", branch)) {
            Ok(remote) => Ok(Some(remote)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn remotes(&self) -> Result<Vec<String>, GitError> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Target of the current branch's upstream, if one is configured and fetched.
    pub fn upstream_id(&self) -> Result<Option<CommitId>, GitError> {
        Ok(self.upstream_oid()?.map(CommitId::from))
    }

    fn upstream_oid(&self) -> Result<Option<git2::Oid>, GitError> {
        let Some(name) = self.current_branch()? else {
            return Ok(None);
        };
        let branch = match self.repo.find_branch(&name, git2::BranchType::Local) {
            Ok(b) => b,
            Err(_) => return Ok(None),
        };
        let upstream = match branch.upstream() {
            Ok(u) => u,
            Err(_) => return Ok(None),
        };
        Ok(upstream.get().target())
    }

    // =========================================================================
    // Index
    // =========================================================================

    fn fresh_index(&self) -> Result<git2::Index, GitError> {
        let mut index = self.repo.index()?;
        index.read(true)?;
        Ok(index)
    }

    pub fn has_conflicts(&self) -> Result<bool, GitError> {
        Ok(self.fresh_index()?.has_conflicts())
    }

    /// All unmerged entries, sorted by path.
    pub fn conflicts(&self) -> Result<Vec<ConflictEntry>, GitError> {
        let index = self.fresh_index()?;
        let mut entries = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let path = [&conflict.our, &conflict.their, &conflict.ancestor]
                .into_iter()
                .flatten()
                .next()
                .map(|e| String::from_utf8_lossy(&e.path).into_owned());
            if let Some(path) = path {
                entries.push(ConflictEntry {
                    path: normalize_separators(&path),
                    has_base: conflict.ancestor.is_some(),
                    has_ours: conflict.our.is_some(),
                    has_theirs: conflict.their.is_some(),
                });
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    // =========================================================================
    // Differences
    // =========================================================================

    /// Working tree against the index, untracked files included as new.
    pub fn diff_workdir(&self) -> Result<Vec<FileDelta>, GitError> {
        let index = self.fresh_index()?;
        let mut opts = git2::DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_typechange(true);
        let diff = self
            .repo
            .diff_index_to_workdir(Some(&index), Some(&mut opts))?;
        Ok(collect_deltas(&diff))
    }

    /// Index against HEAD (or the empty tree on an unborn branch).
    pub fn diff_staged(&self) -> Result<Vec<FileDelta>, GitError> {
        let index = self.fresh_index()?;
        let head_tree = match self.repo.head() {
            Ok(head) => head.peel_to_tree().ok(),
            Err(_) => None,
        };
        let mut diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;
        let mut find = git2::DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;
        Ok(collect_deltas(&diff))
    }

    /// Paths whose index entry differs from HEAD.
    pub fn staged_paths(&self) -> Result<Vec<String>, GitError> {
        let mut paths = Vec::new();
        for delta in self.diff_staged()? {
            if let Some(old) = delta.old_path {
                paths.push(old);
            }
            paths.push(delta.path);
        }
        Ok(paths)
    }

    // =========================================================================
    // History
    // =========================================================================

    fn walk(&self, from: git2::Oid, hide: &[git2::Oid]) -> Result<git2::Revwalk<'_>, GitError> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        walk.push(from)?;
        for oid in hide {
            walk.hide(*oid)?;
        }
        Ok(walk)
    }

    fn head_oid(&self) -> Option<git2::Oid> {
        self.repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .map(|c| c.id())
    }

    fn remote_tracking_oids(&self) -> Result<Vec<git2::Oid>, GitError> {
        let mut oids = Vec::new();
        for reference in self.repo.references_glob("refs/remotes/*")? {
            if let Some(oid) = reference?.resolve().ok().and_then(|r| r.target()) {
                oids.push(oid);
            }
        }
        Ok(oids)
    }

    /// Commits reachable from HEAD that the remote does not have.
    ///
    /// Measured against the upstream when there is one, otherwise against
    /// every remote-tracking ref.
    pub fn local_only_ids(&self) -> Result<Vec<CommitId>, GitError> {
        let Some(head) = self.head_oid() else {
            return Ok(Vec::new());
        };
        let hide = match self.upstream_oid()? {
            Some(upstream) => vec![upstream],
            None => self.remote_tracking_oids()?,
        };
        let walk = self.walk(head, &hide)?;
        walk.map(|oid| Ok(CommitId::from(oid?))).collect()
    }

    /// Commits on the upstream that HEAD does not have.
    pub fn remote_only_ids(&self) -> Result<Vec<CommitId>, GitError> {
        let Some(upstream) = self.upstream_oid()? else {
            return Ok(Vec::new());
        };
        let hide: Vec<_> = self.head_oid().into_iter().collect();
        let walk = self.walk(upstream, &hide)?;
        walk.map(|oid| Ok(CommitId::from(oid?))).collect()
    }

    /// Whether `id` is HEAD or one of its ancestors.
    pub fn head_contains(&self, id: &CommitId) -> Result<bool, GitError> {
        let Some(head) = self.head_oid() else {
            return Ok(false);
        };
        let oid = git2::Oid::from_str(id.as_str())?;
        if head == oid {
            return Ok(true);
        }
        match self.repo.graph_descendant_of(head, oid) {
            Ok(found) => Ok(found),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn commit_info(&self, id: &CommitId) -> Result<CommitInfo, GitError> {
        let oid = git2::Oid::from_str(id.as_str())?;
        let commit = self.repo.find_commit(oid)?;
        Ok(to_commit_info(&commit))
    }

    /// History entries for `rev_spec` (HEAD by default).
    ///
    /// When walking HEAD, commits the upstream has but HEAD lacks are
    /// appended as [`HistoryKind::RemoteOnly`].
    pub fn history(
        &self,
        max_count: Option<usize>,
        skip: usize,
        rev_spec: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, GitError> {
        let start = match rev_spec {
            Some(spec) => Some(self.repo.revparse_single(spec)?.peel_to_commit()?.id()),
            None => self.head_oid(),
        };
        let Some(start) = start else {
            return Ok(Vec::new());
        };

        let local_only: HashSet<CommitId> = self.local_only_ids()?.into_iter().collect();
        let limit = max_count.unwrap_or(usize::MAX);

        let mut entries = Vec::new();
        for oid in self.walk(start, &[])?.skip(skip).take(limit) {
            let commit = self.repo.find_commit(oid?)?;
            let info = to_commit_info(&commit);
            let kind = if local_only.contains(&info.id) {
                HistoryKind::LocalOnly
            } else {
                HistoryKind::Synced
            };
            entries.push(info.into_history_entry(kind));
        }

        if rev_spec.is_none() {
            for id in self.remote_only_ids()?.into_iter().skip(skip).take(limit) {
                let info = self.commit_info(&id)?;
                entries.push(info.into_history_entry(HistoryKind::RemoteOnly));
            }
        }
        Ok(entries)
    }

    /// The most recent commit reachable from `rev` that changed `path`.
    pub fn last_commit_touching(
        &self,
        path: &str,
        rev: &str,
    ) -> Result<Option<CommitInfo>, GitError> {
        let start = self.repo.revparse_single(rev)?.peel_to_commit()?.id();
        let path = Path::new(path);
        let entry_id = |commit: &git2::Commit<'_>| {
            commit
                .tree()
                .ok()
                .and_then(|t| t.get_path(path).ok())
                .map(|e| e.id())
        };

        for oid in self.walk(start, &[])? {
            let commit = self.repo.find_commit(oid?)?;
            let current = entry_id(&commit);
            let parent = commit.parent(0).ok().and_then(|p| entry_id(&p));
            if current != parent {
                return Ok(Some(to_commit_info(&commit)));
            }
        }
        Ok(None)
    }

    /// Content of `path` as stored at `rev`, if it exists there.
    pub fn blob_at(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let object = match self.repo.revparse_single(rev) {
            Ok(o) => o,
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        let tree = object.peel_to_tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(_) => return Ok(None),
        };
        let blob = entry.to_object(&self.repo)?.peel_to_blob()?;
        Ok(Some(blob.content().to_vec()))
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Local branches followed by remote-tracking branches.
    pub fn branches(&self) -> Result<Vec<Branch>, GitError> {
        let mut local = Vec::new();
        let mut remote = Vec::new();
        for item in self.repo.branches(None)? {
            let (branch, kind) = item?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }
            let commit = branch.get().peel_to_commit().ok();
            let model = Branch {
                name,
                id: commit.as_ref().map(|c| c.id().into()),
                last_changed: commit.as_ref().map(|c| commit_time(c)),
                is_local: kind == git2::BranchType::Local,
            };
            if model.is_local {
                local.push(model);
            } else {
                remote.push(model);
            }
        }
        local.extend(remote);
        Ok(local)
    }
}

fn collect_deltas(diff: &git2::Diff<'_>) -> Vec<FileDelta> {
    let path_of = |file: git2::DiffFile<'_>| {
        file.path()
            .map(|p| normalize_separators(&p.to_string_lossy()))
    };

    diff.deltas()
        .filter_map(|delta| {
            let new_path = path_of(delta.new_file());
            let old_path = path_of(delta.old_file());
            let (kind, path, old) = match delta.status() {
                git2::Delta::Added | git2::Delta::Untracked => (ChangeKind::New, new_path?, None),
                git2::Delta::Deleted => (ChangeKind::Deleted, old_path?, None),
                git2::Delta::Renamed => (ChangeKind::Renamed, new_path?, old_path),
                git2::Delta::Modified
                | git2::Delta::Typechange
                | git2::Delta::Conflicted
                | git2::Delta::Copied => (ChangeKind::Modified, new_path.or(old_path)?, None),
                _ => return None,
            };
            Some(FileDelta {
                kind,
                path,
                old_path: old,
            })
        })
        .collect()
}

fn commit_time(commit: &git2::Commit<'_>) -> DateTime<Utc> {
    Utc.timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_default()
}

fn to_commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let author = commit.author();
    CommitInfo {
        id: commit.id().into(),
        author_name: author.name().unwrap_or_default().to_string(),
        author_email: author.email().unwrap_or_default().to_string(),
        message: commit.message().unwrap_or_default().trim_end().to_string(),
        time: commit_time(commit),
        parents: commit.parent_ids().map(CommitId::from).collect(),
    }
}
