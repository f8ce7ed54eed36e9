//! vc::changes
//!
//! Enumerates working-tree and staged differences.

use std::collections::BTreeSet;
use std::path::Path;

use super::repository::Repository;
use crate::core::types::{Change, ChangeKind, ChangeSet};
use crate::git::{FileDelta, GitError};

/// Read-only view of pending changes.
#[derive(Debug, Clone, Copy)]
pub struct ChangeInspector<'a> {
    repo: &'a Repository,
}

impl<'a> ChangeInspector<'a> {
    pub(crate) fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Pending changes.
    ///
    /// With `staged = false` the working tree is compared against the index
    /// (untracked files count as new); with `staged = true` the index is
    /// compared against the last commit, or the empty tree on an unborn
    /// branch. Each path lands in exactly one sequence.
    pub fn get_pending_changes(&self, staged: bool) -> Result<ChangeSet, GitError> {
        let git = self.repo.git();
        let deltas = if staged {
            git.diff_staged()?
        } else {
            git.diff_workdir()?
        };
        Ok(to_change_set(deltas))
    }

    /// Deleted paths as `(unstaged, staged)`.
    ///
    /// Unstaged: deleted in the working tree but still indexed, plus conflicts
    /// whose stage-2 ("ours") side is missing. Staged: deletions already in
    /// the index, plus conflicts whose stage-3 ("theirs") side is missing.
    pub fn get_deleted_files(&self) -> Result<(Vec<String>, Vec<String>), GitError> {
        let git = self.repo.git();
        let mut unstaged = BTreeSet::new();
        let mut staged = BTreeSet::new();

        for conflict in git.conflicts()? {
            if conflict.deleted_by_ours() {
                unstaged.insert(conflict.path);
            } else if conflict.deleted_by_theirs() {
                staged.insert(conflict.path);
            }
        }
        for delta in git.diff_workdir()? {
            if delta.kind == ChangeKind::Deleted {
                unstaged.insert(delta.path);
            }
        }
        for delta in git.diff_staged()? {
            if delta.kind == ChangeKind::Deleted {
                staged.insert(delta.path);
            }
        }

        Ok((unstaged.into_iter().collect(), staged.into_iter().collect()))
    }

    /// Paths with unresolved conflicts.
    pub fn get_conflicts(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .repo
            .git()
            .conflicts()?
            .into_iter()
            .map(|c| c.path)
            .collect())
    }

    pub fn has_conflicts(&self) -> Result<bool, GitError> {
        self.repo.git().has_conflicts()
    }

    /// Whether `path` (absolute or repository-relative) is conflicted.
    pub fn is_file_conflicting(&self, path: &Path) -> Result<bool, GitError> {
        let rel = self.repo.paths().relative(path);
        Ok(self.get_conflicts()?.iter().any(|p| *p == rel))
    }

    /// Any staged or unstaged change, untracked files optionally included.
    pub fn has_pending_changes(&self, include_untracked: bool) -> Result<bool, GitError> {
        let git = self.repo.git();
        if !git.diff_staged()?.is_empty() {
            return Ok(true);
        }
        let untracked = |d: &FileDelta| d.kind == ChangeKind::New;
        Ok(git
            .diff_workdir()?
            .iter()
            .any(|d| include_untracked || !untracked(d)))
    }
}

fn to_change_set(deltas: Vec<FileDelta>) -> ChangeSet {
    let mut set = ChangeSet::default();
    for delta in deltas {
        let change = match delta.old_path {
            Some(old) => Change::renamed(old, delta.path),
            None => Change::new(delta.path),
        };
        set.insert(delta.kind, change);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_paths_collapse() {
        let deltas = vec![
            FileDelta {
                kind: ChangeKind::Modified,
                path: "a.txt".into(),
                old_path: None,
            },
            FileDelta {
                kind: ChangeKind::Deleted,
                path: "a.txt".into(),
                old_path: None,
            },
            FileDelta {
                kind: ChangeKind::Renamed,
                path: "b.txt".into(),
                old_path: Some("c.txt".into()),
            },
        ];
        let set = to_change_set(deltas);
        assert_eq!(set.size(), 2);
        assert!(set.is_disjoint());
        assert_eq!(set.renamed_files[0].old_path.as_deref(), Some("c.txt"));
    }
}
