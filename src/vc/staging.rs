//! vc::staging
//!
//! Index mutations. None of these touch the network.

use tracing::debug;

use super::repository::Repository;
use crate::git::GitError;

/// Stages and unstages paths.
#[derive(Debug, Clone, Copy)]
pub struct StagingController<'a> {
    repo: &'a Repository,
}

impl<'a> StagingController<'a> {
    pub(crate) fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Stage `paths`, including deletions.
    pub fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        debug!(count = paths.len(), "staging");
        self.run_with_paths(&["add", "-A", "--"], paths)
    }

    pub fn stage_all(&self) -> Result<(), GitError> {
        self.repo.runner().run_checked(["add", "-A", "--", "."])?;
        Ok(())
    }

    /// Remove `paths` from the staged set, keeping working-tree content.
    pub fn unstage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        debug!(count = paths.len(), "unstaging");
        if self.repo.is_unborn() {
            // Nothing to restore from; drop the entries from the index instead
            return self.run_with_paths(
                &["rm", "--cached", "-r", "-q", "--ignore-unmatch", "--"],
                paths,
            );
        }
        self.run_with_paths(&["restore", "--staged", "--"], paths)
    }

    pub fn unstage_all(&self) -> Result<(), GitError> {
        let staged = self.repo.git().staged_paths()?;
        self.unstage(&staged)
    }

    /// Make the staged set exactly `desired`.
    pub fn sync_staged_files(&self, desired: &[String]) -> Result<(), GitError> {
        self.unstage_all()?;
        self.stage(desired)
    }

    fn run_with_paths(&self, args: &[&str], paths: &[String]) -> Result<(), GitError> {
        let mut full: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        full.extend(paths.iter().cloned());
        self.repo.runner().run_checked(&full)?;
        Ok(())
    }
}
