//! vc::sync
//!
//! Fetch, push, and update (pull with rebase) against the branch's remote.
//!
//! # Update
//!
//! 1. Refuse when tracked files have uncommitted changes; nothing is contacted.
//! 2. Record the local-only commits, which a rebase is about to rewrite.
//! 3. Pull with rebase, streaming progress.
//! 4. On conflicts, persist the recorded ids in the update journal so a later
//!    resolution can prune them, and report [`UpdateState::Conflict`].
//! 5. On success, prune rewritten ids and refresh the history view.
//!
//! A canceled update aborts any rebase it started, leaving no
//! [`PendingOperation`](crate::core::types::PendingOperation) behind.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::repository::Repository;
use crate::core::ops::journal::UpdateJournal;
use crate::core::types::{CommitId, OperationKind, SyncFailure, UpdateState};
use crate::git::{GitError, StreamOutcome};
use crate::host::{HostContext, NotifyKind};
use crate::progress::ProgressSink;

/// Network operations for one repository, bound to a host channel.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine<'a> {
    repo: &'a Repository,
    host: &'a HostContext,
}

impl<'a> SyncEngine<'a> {
    pub(crate) fn new(repo: &'a Repository, host: &'a HostContext) -> Self {
        Self { repo, host }
    }

    /// Download remote objects without touching the working tree.
    ///
    /// Returns `true` on success or when no remote is configured, `false`
    /// when canceled.
    pub fn fetch(&self, progress: &dyn ProgressSink) -> Result<bool, GitError> {
        let Some(remote) = self.repo.default_remote()? else {
            debug!("no remote configured, nothing to fetch");
            return Ok(true);
        };

        let outcome = self
            .repo
            .runner()
            .run_streaming(["fetch", "--progress", remote.as_str()], progress)?;
        match outcome {
            StreamOutcome::Canceled => {
                info!(%remote, "fetch canceled");
                Ok(false)
            }
            StreamOutcome::Finished(output) if output.success => {
                info!(%remote, "fetched");
                self.host.refresh_history();
                Ok(true)
            }
            StreamOutcome::Finished(output) => {
                Err(GitError::from_command("fetch", output.code, &output.stderr))
            }
        }
    }

    /// Upload local commits, setting the upstream on first push.
    pub fn push(&self, progress: &dyn ProgressSink) -> UpdateState {
        match self.try_push(progress) {
            Ok(state) => state,
            Err(e) => self.fail(&e),
        }
    }

    fn try_push(&self, progress: &dyn ProgressSink) -> Result<UpdateState, GitError> {
        let Some(branch) = self.repo.current_branch_name()? else {
            return Ok(self.fail_with(SyncFailure::Other(
                "HEAD is detached; check out a branch before pushing".to_string(),
            )));
        };
        let Some(remote) = self.repo.default_remote()? else {
            self.host
                .notify(NotifyKind::Info, "No remote", "This repository has no remote to push to");
            return Ok(UpdateState::NoRemote);
        };

        let mut args = vec!["push", "--progress"];
        if self.repo.remote_change_id()?.is_none() {
            args.push("--set-upstream");
        }
        args.push(remote.as_str());
        args.push(branch.as_str());

        match self.repo.runner().run_streaming(&args, progress)? {
            StreamOutcome::Canceled => {
                info!(%remote, %branch, "push canceled");
                Ok(UpdateState::Cancel)
            }
            StreamOutcome::Finished(output) if output.success => {
                info!(%remote, %branch, "pushed");
                self.host.notify(NotifyKind::Success, "Push Successful", "");
                self.host.refresh_history();
                self.auto_prune();
                Ok(UpdateState::Ok)
            }
            StreamOutcome::Finished(output) => {
                Err(GitError::from_command("push", output.code, &output.stderr))
            }
        }
    }

    /// Best-effort cache prune after a push, when configured.
    fn auto_prune(&self) {
        let Some(days) = self.repo.config().auto_prune_days() else {
            return;
        };
        let (recent, force) = if days == 0 { (None, true) } else { (Some(days), false) };
        match self.repo.lfs().prune(recent, force) {
            Ok(count) => info!(count, "pruned cached objects after push"),
            Err(e) => warn!(error = %e, "pruning after push failed"),
        }
    }

    /// Pull the upstream and rebase local commits onto it.
    pub fn update(&self, progress: &dyn ProgressSink) -> UpdateState {
        match self.try_update(progress) {
            Ok(state) => state,
            Err(e) => self.fail(&e),
        }
    }

    fn try_update(&self, progress: &dyn ProgressSink) -> Result<UpdateState, GitError> {
        if self.repo.changes().has_pending_changes(false)? {
            return Ok(self.fail_with(SyncFailure::UncommittedChanges));
        }
        if self.repo.branch_remote()?.is_none() {
            self.host.notify(
                NotifyKind::Info,
                "No remote",
                "The current branch does not track a remote branch",
            );
            return Ok(UpdateState::NoRemote);
        }

        let local_ids = self.repo.git().local_only_ids()?;
        debug!(count = local_ids.len(), "local-only commits before update");

        let outcome = self
            .repo
            .runner()
            .run_streaming(["pull", "--rebase", "--progress"], progress)?;

        let output = match outcome {
            StreamOutcome::Canceled => return Ok(self.abandon_update()),
            StreamOutcome::Finished(output) => output,
        };

        if output.success && !self.repo.is_rebasing() {
            prune_rewritten(self.repo, self.host, &local_ids)?;
            info!("update complete");
            self.host.notify(NotifyKind::Success, "Update Successful", "");
            self.host.refresh_history();
            return Ok(UpdateState::Ok);
        }

        if self.repo.git().has_conflicts()? || self.repo.is_rebasing() || self.repo.is_merging() {
            let kind = if self.repo.is_merging() && !self.repo.is_rebasing() {
                OperationKind::Merge
            } else {
                OperationKind::Rebase
            };
            UpdateJournal::new(kind, local_ids).write(self.repo.paths())?;
            info!(%kind, "update paused on conflicts");
            self.host.notify(
                NotifyKind::Info,
                "Conflicts",
                "Some files changed on both sides. Resolve the conflicts to finish the update",
            );
            self.host.refresh_history();
            return Ok(UpdateState::Conflict);
        }

        Err(GitError::from_command("pull", output.code, &output.stderr))
    }

    /// Undo whatever a canceled pull left half done.
    ///
    /// Always reports [`UpdateState::Cancel`]. A killed pull can leave the
    /// index locked, in which case the abort fails and the paused operation
    /// stays for [`ConflictResolver::cancel`](super::ConflictResolver::cancel).
    fn abandon_update(&self) -> UpdateState {
        let abort = if self.repo.is_rebasing() {
            warn!("aborting rebase started by canceled update");
            Some(self.repo.runner().run_checked(["rebase", "--abort"]))
        } else if self.repo.is_merging() {
            warn!("aborting merge started by canceled update");
            Some(self.repo.runner().run_checked(["merge", "--abort"]))
        } else {
            None
        };
        if let Some(Err(e)) = abort {
            warn!(error = %e, "abort after canceled update failed");
        }
        if let Err(e) = UpdateJournal::remove(self.repo.paths()) {
            warn!(error = %e, "cannot remove update journal");
        }
        info!("update canceled");
        UpdateState::Cancel
    }

    fn fail(&self, err: &GitError) -> UpdateState {
        if matches!(err, GitError::Canceled) {
            return UpdateState::Cancel;
        }
        warn!(error = %err, "sync failed");
        self.fail_with(err.to_sync_failure())
    }

    fn fail_with(&self, failure: SyncFailure) -> UpdateState {
        self.host.notify_failure(&failure);
        UpdateState::Error(failure)
    }
}

/// Prune those of `ids` that HEAD no longer contains.
///
/// Returns the pruned ids.
pub(crate) fn prune_rewritten(
    repo: &Repository,
    host: &HostContext,
    ids: &[CommitId],
) -> Result<Vec<CommitId>, GitError> {
    let mut seen = BTreeSet::new();
    let mut stale = Vec::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        if !repo.git().head_contains(id)? {
            stale.push(id.clone());
        }
    }
    host.prune_history(&stale);
    Ok(stale)
}
