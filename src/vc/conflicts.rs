//! vc::conflicts
//!
//! Resolving a paused merge, rebase, or conflicted stash application.
//!
//! # Sides
//!
//! Users ask to keep "my" work ([`ConflictHandling::TakeOurs`]) or "their"
//! work ([`ConflictHandling::TakeTheirs`]). While rebasing, the tool replays
//! local commits onto the upstream, so its own `--ours` is the upstream and
//! `--theirs` is the local commit. The mapping therefore inverts between
//! merge and rebase. A conflicted stash application (neither merging nor
//! rebasing) follows the rebase mapping.
//!
//! | request    | rebasing / neither        | merging                   |
//! |------------|---------------------------|---------------------------|
//! | TakeOurs   | rm staged-deleted, theirs | rm unstaged-deleted, ours |
//! | TakeTheirs | rm unstaged-deleted, ours | rm staged-deleted, theirs |
//!
//! # Continuation
//!
//! Once no conflicted path remains the paused operation is continued. A
//! rebase replaying several local commits may stop again on the next commit;
//! [`ResolveOutcome::NextConflict`] hands that batch back to the caller, who
//! resolves it the same way. When the rebase finally completes, the paused
//! head and the journal's queued commits are pruned from the history view.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::lfs::parse_conflicting_pointer;
use super::repository::Repository;
use super::sync::prune_rewritten;
use crate::core::ops::journal::UpdateJournal;
use crate::core::types::{
    CommitId, ConflictHandling, ConflictResolveState, HistoryEntry, PendingOperation, UpdateState,
};
use crate::git::{command_exists, GitError};
use crate::host::{HostContext, NotifyKind};

const CONTINUE_REBASE: [&str; 4] = ["-c", "core.editor=true", "rebase", "--continue"];
const SKIP_REBASE: [&str; 2] = ["rebase", "--skip"];
const CONTINUE_MERGE: [&str; 4] = ["-c", "core.editor=true", "merge", "--continue"];

const DEFAULT_MERGE_TOOL: &str = "vscode";

/// What a resolution request left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Paths remain conflicted; nothing was continued.
    StillConflicted,
    /// Continuing the rebase stopped on the next commit's conflicts.
    NextConflict,
    /// The external merge tool ran; conflict state is whatever it left.
    ExternalLaunched,
    /// The paused operation was aborted.
    Canceled,
    /// The paused operation finished.
    Completed(UpdateState),
}

/// Everything the host shows for one conflicted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetails {
    pub path: String,
    pub current_branch: String,
    pub incoming_branch: String,
    pub current_entry: Option<HistoryEntry>,
    pub incoming_entry: Option<HistoryEntry>,
    /// False when both sides are large-file pointers.
    pub is_text: bool,
    pub current_cached_path: Option<PathBuf>,
    pub incoming_cached_path: Option<PathBuf>,
}

/// Conflict handling for one repository, bound to a host channel.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver<'a> {
    repo: &'a Repository,
    host: &'a HostContext,
}

impl<'a> ConflictResolver<'a> {
    pub(crate) fn new(repo: &'a Repository, host: &'a HostContext) -> Self {
        Self { repo, host }
    }

    /// Apply `handling` to `paths` (every conflicted path when `None`).
    pub fn resolve(
        &self,
        handling: ConflictHandling,
        paths: Option<&[String]>,
    ) -> Result<ResolveOutcome, GitError> {
        let pending = self.repo.pending_operation()?;
        debug!(?handling, ?pending, "resolving conflicts");

        match handling {
            ConflictHandling::Cancel => self.cancel(),
            ConflictHandling::External => self.launch_external(paths),
            ConflictHandling::TakeOurs | ConflictHandling::TakeTheirs => {
                let targets = self.targets(paths)?;
                if self.repo.is_merging() && !self.repo.is_rebasing() {
                    self.resolve_while_merging(handling, &targets)?;
                } else {
                    self.resolve_while_rebasing(handling, &targets)?;
                }
                if self.repo.git().has_conflicts()? {
                    info!("conflicts remain");
                    return Ok(ResolveOutcome::StillConflicted);
                }
                self.continue_operation(pending)
            }
        }
    }

    /// Abort the paused operation, restoring the pre-operation state.
    pub fn cancel(&self) -> Result<ResolveOutcome, GitError> {
        let runner = self.repo.runner();
        if self.repo.is_rebasing() {
            runner.run_checked(["rebase", "--abort"])?;
        } else if self.repo.is_merging() {
            runner.run_checked(["merge", "--abort"])?;
        } else if self.repo.git().has_conflicts()? {
            runner.run_checked(["reset", "--merge"])?;
        }
        UpdateJournal::remove(self.repo.paths())?;
        info!("conflict resolution canceled");
        self.host.refresh_history();
        Ok(ResolveOutcome::Canceled)
    }

    /// Run the configured merge tool over `paths` and wait for it to exit.
    pub fn launch_external(&self, paths: Option<&[String]>) -> Result<ResolveOutcome, GitError> {
        let tool = self.repo.config().merge_tool().unwrap_or(DEFAULT_MERGE_TOOL);
        let mut args: Vec<String> = vec!["-c".into(), "mergetool.keepBackup=false".into()];

        let tool_name = if tool == "vscode" || tool == "code" {
            if !command_exists("code") {
                return Err(GitError::ToolNotFound("code".to_string()));
            }
            args.push("-c".into());
            args.push("mergetool.vscode.cmd=code -n --wait \"$MERGED\"".into());
            "vscode"
        } else {
            tool
        };

        args.extend(["mergetool", "--no-prompt", "--tool", tool_name].map(String::from));
        if let Some(paths) = paths {
            args.push("--".into());
            args.extend(paths.iter().map(|p| self.repo.paths().relative(Path::new(p))));
        }

        info!(tool = tool_name, "launching merge tool");
        self.repo.runner().run_checked(&args)?;
        self.host.refresh_history();
        Ok(ResolveOutcome::ExternalLaunched)
    }

    /// Resolve during a rebase, or a conflicted stash application.
    fn resolve_while_rebasing(
        &self,
        handling: ConflictHandling,
        targets: &[String],
    ) -> Result<(), GitError> {
        let (unstaged_deleted, staged_deleted) = self.repo.changes().get_deleted_files()?;
        match handling {
            ConflictHandling::TakeOurs => {
                self.apply_resolution(ConflictResolveState::TakeTheirs, targets, &staged_deleted)
            }
            ConflictHandling::TakeTheirs => {
                self.apply_resolution(ConflictResolveState::TakeOurs, targets, &unstaged_deleted)
            }
            other => Err(GitError::InvalidInput(format!("not a side: {other:?}"))),
        }
    }

    fn resolve_while_merging(
        &self,
        handling: ConflictHandling,
        targets: &[String],
    ) -> Result<(), GitError> {
        match handling {
            ConflictHandling::TakeOurs => {
                let (unstaged_deleted, _) = self.repo.changes().get_deleted_files()?;
                self.apply_resolution(ConflictResolveState::TakeOurs, targets, &unstaged_deleted)
            }
            ConflictHandling::TakeTheirs => {
                let (_, staged_deleted) = self.repo.changes().get_deleted_files()?;
                self.apply_resolution(ConflictResolveState::TakeTheirs, targets, &staged_deleted)
            }
            other => Err(GitError::InvalidInput(format!("not a side: {other:?}"))),
        }
    }

    /// Remove the targets the chosen side deleted, check out the rest from
    /// that side, and mark them resolved.
    fn apply_resolution(
        &self,
        side: ConflictResolveState,
        targets: &[String],
        deleted: &[String],
    ) -> Result<(), GitError> {
        let deleted: BTreeSet<&str> = deleted.iter().map(String::as_str).collect();
        let (removed, kept): (Vec<String>, Vec<String>) = targets
            .iter()
            .cloned()
            .partition(|p| deleted.contains(p.as_str()));
        let runner = self.repo.runner();

        if !removed.is_empty() {
            let mut args: Vec<String> = ["rm", "-q", "--ignore-unmatch", "--"]
                .map(String::from)
                .to_vec();
            args.extend(removed.iter().cloned());
            let output = runner.run(&args)?;
            if !output.success {
                warn!(stderr = %output.stderr.trim(), "removing deleted paths failed");
            }
        }

        if kept.is_empty() {
            return Ok(());
        }
        if let Some(flag) = side.checkout_flag() {
            let mut args = vec!["checkout".to_string(), flag.to_string(), "--".to_string()];
            args.extend(kept.iter().cloned());
            runner.run_checked(&args)?;
        }
        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(kept);
        runner.run_checked(&args)?;

        debug!(?side, removed = removed.len(), "applied resolution");
        Ok(())
    }

    /// Continue the paused operation now that nothing is conflicted.
    fn continue_operation(
        &self,
        pending: Option<PendingOperation>,
    ) -> Result<ResolveOutcome, GitError> {
        let runner = self.repo.runner();

        if self.repo.is_rebasing() {
            let mut args: &[&str] = &CONTINUE_REBASE;
            loop {
                let output = runner.run(args)?;
                if !self.repo.is_rebasing() {
                    if !output.success {
                        return Err(GitError::from_command("rebase", output.code, &output.stderr));
                    }
                    break;
                }
                if self.repo.git().has_conflicts()? {
                    info!("rebase stopped on the next conflict");
                    self.host.notify(
                        NotifyKind::Info,
                        "Conflicts",
                        "Another local change conflicts. Resolve it to continue the update",
                    );
                    self.host.refresh_history();
                    return Ok(ResolveOutcome::NextConflict);
                }
                // A commit whose changes were all dropped has nothing left to
                // record and must be skipped
                if !output.success && self.repo.git().diff_staged()?.is_empty() {
                    debug!("skipping emptied commit");
                    args = &SKIP_REBASE;
                    continue;
                }
                return Err(GitError::from_command("rebase", output.code, &output.stderr));
            }
        } else if self.repo.is_merging() {
            runner.run_checked(CONTINUE_MERGE)?;
        }

        self.complete(pending)
    }

    fn complete(&self, pending: Option<PendingOperation>) -> Result<ResolveOutcome, GitError> {
        let mut ids: Vec<CommitId> = Vec::new();
        if let Some(pending) = pending {
            ids.extend(pending.paused_head_ref);
            ids.extend(pending.queued_local_commit_ids);
        }
        prune_rewritten(self.repo, self.host, &ids)?;
        UpdateJournal::remove(self.repo.paths())?;

        info!("conflicts resolved");
        self.host
            .notify(NotifyKind::Success, "Update Successful", "All conflicts are resolved");
        self.host.refresh_history();
        Ok(ResolveOutcome::Completed(UpdateState::Ok))
    }

    fn targets(&self, paths: Option<&[String]>) -> Result<Vec<String>, GitError> {
        match paths {
            Some(paths) => Ok(paths
                .iter()
                .map(|p| self.repo.paths().relative(Path::new(p)))
                .collect()),
            None => self.repo.changes().get_conflicts(),
        }
    }

    /// Branch names, last commits, and cached large-file content for both
    /// sides of a conflicted file. `None` if `path` is not conflicted.
    pub fn conflict_details(&self, path: &Path) -> Result<Option<ConflictDetails>, GitError> {
        if !self.repo.changes().is_file_conflicting(path)? {
            return Ok(None);
        }
        let rel = self.repo.paths().relative(path);
        let bytes = match fs::read(self.repo.root_path().join(&rel)) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %rel, error = %e, "conflicted file unreadable");
                return Ok(None);
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        let head_name = self
            .repo
            .current_branch_name()?
            .unwrap_or_else(|| "HEAD".to_string());
        let (current, incoming) = marker_labels(&content);
        let current_branch = match current {
            Some(label) if label != "HEAD" => label,
            _ => head_name,
        };
        let incoming_branch = incoming.unwrap_or_else(|| "MERGE_HEAD".to_string());

        let entry_on = |rev: &str| {
            match self.repo.get_last_history_entry_for_file(&rel, Some(rev)) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(rev, error = %e, "no history for conflicted side");
                    None
                }
            }
        };
        let current_entry = entry_on(&current_branch);
        let incoming_entry = entry_on(&incoming_branch);

        let (is_text, current_cached_path, incoming_cached_path) =
            match parse_conflicting_pointer(&content) {
                Some((ours, theirs)) => {
                    let cached = |oid: &str| {
                        self.repo
                            .paths()
                            .lfs_object_path(oid)
                            .filter(|p| p.is_file())
                    };
                    (false, cached(&ours), cached(&theirs))
                }
                None => (true, None, None),
            };

        Ok(Some(ConflictDetails {
            path: rel,
            current_branch,
            incoming_branch,
            current_entry,
            incoming_entry,
            is_text,
            current_cached_path,
            incoming_cached_path,
        }))
    }
}

/// Labels after the `<<<<<<<` and `>>>>>>>` markers, first word only.
fn marker_labels(content: &str) -> (Option<String>, Option<String>) {
    let label = |prefix: &str| {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(prefix)?;
            rest.split_whitespace().next().map(str::to_string)
        })
    };
    (label("<<<<<<< "), label(">>>>>>> "))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod markers {
        use super::*;

        #[test]
        fn merge_labels() {
            let content = "<<<<<<< HEAD\nmine\n=======\ntheirs\n>>>>>>> feature\n";
            assert_eq!(
                marker_labels(content),
                (Some("HEAD".to_string()), Some("feature".to_string()))
            );
        }

        #[test]
        fn rebase_labels_keep_first_word() {
            let content = "<<<<<<< HEAD\na\n=======\nb\n>>>>>>> 1a2b3c4 (tweak lighting)\n";
            assert_eq!(marker_labels(content).1.as_deref(), Some("1a2b3c4"));
        }

        #[test]
        fn no_markers() {
            assert_eq!(marker_labels("plain\n"), (None, None));
        }
    }
}
