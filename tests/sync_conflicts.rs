//! Update, push and conflict resolution against a real bare remote.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use vcbridge::core::types::{ConflictHandling, OperationKind, SyncFailure, UpdateState};
use vcbridge::host::NotifyKind;
use vcbridge::progress::{CancelFlag, NullProgress, ProgressPhase, ProgressSink};
use vcbridge::vc::ResolveOutcome;

/// Cancels as soon as the first progress line arrives.
#[derive(Default)]
struct CancelOnFirstUpdate {
    cancel: CancelFlag,
    updates: AtomicUsize,
}

impl ProgressSink for CancelOnFirstUpdate {
    fn update(&self, _: ProgressPhase, _: u64, _: u64, _: Option<&str>) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}

mod update {
    use super::*;

    #[test]
    fn fast_forward_prunes_nothing() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let repo = shared.open_alice();
        let (host, ctx) = recording_host();
        let state = repo.sync(&ctx).update(&NullProgress);

        assert_eq!(state, UpdateState::Ok);
        assert_eq!(read(&shared.alice(), "scene.ma"), scene("bob"));
        assert!(host.pruned_ids().is_empty());
        assert!(host
            .notifications()
            .iter()
            .any(|(kind, title, _)| *kind == NotifyKind::Success && title == "Update Successful"));
    }

    #[test]
    fn rebased_local_commits_are_pruned() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "notes.txt", "alice was here\n");
        let local = commit_all(&alice, "alice: notes");

        let repo = shared.open_alice();
        let (host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Ok);

        let pruned: Vec<String> = host.pruned_ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(pruned, vec![local.clone()]);
        assert_ne!(head(&alice), local);
        assert_eq!(read(&alice, "scene.ma"), scene("bob"));
        assert_eq!(read(&alice, "notes.txt"), "alice was here\n");
    }

    #[test]
    fn uncommitted_changes_are_refused() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        let before = head(&alice);
        write(&alice, "scene.ma", &scene("dirty"));

        let repo = shared.open_alice();
        let (host, ctx) = recording_host();
        let state = repo.sync(&ctx).update(&NullProgress);

        assert_eq!(state, UpdateState::Error(SyncFailure::UncommittedChanges));
        assert_eq!(head(&alice), before);
        assert_eq!(read(&alice, "scene.ma"), scene("dirty"));
        assert!(host
            .notifications()
            .iter()
            .any(|(kind, _, _)| *kind == NotifyKind::Info));
    }

    #[test]
    fn canceled_update_leaves_nothing_paused() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        let before = commit_all(&alice, "alice: conflicting edit");

        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let state = repo.sync(&ctx).update(&ctx.progress(cancel));

        assert_eq!(state, UpdateState::Cancel);
        assert!(!repo.is_rebasing());
        assert!(repo.pending_operation().unwrap().is_none());
        assert_eq!(head(&alice), before);
    }

    #[test]
    fn cancel_during_download_kills_the_pull() {
        let shared = SharedRepo::new();
        let bob = shared.bob();
        for i in 0..50 {
            write(&bob, &format!("shots/shot{i:03}.ma"), &scene(&format!("shot {i}")));
        }
        commit_all(&bob, "bob: shots");
        run_git(&bob, &["push", "-q", "origin", "main"]);

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        commit_all(&alice, "alice: edit");

        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        let progress = CancelOnFirstUpdate::default();
        let state = repo.sync(&ctx).update(&progress);

        assert_eq!(state, UpdateState::Cancel);
        assert!(progress.updates.load(Ordering::SeqCst) >= 1);
        assert!(!repo.is_rebasing());
        assert!(repo.pending_operation().unwrap().is_none());
    }
}

mod rebase_conflicts {
    use super::*;

    #[test]
    fn two_conflicting_commits_resolve_one_at_a_time() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice-a"));
        let first = commit_all(&alice, "alice: a");
        write(&alice, "scene.ma", &scene("alice-b"));
        let second = commit_all(&alice, "alice: b");

        let repo = shared.open_alice();
        let (host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);

        let pending = repo.pending_operation().unwrap().expect("paused update");
        assert_eq!(pending.kind, OperationKind::Rebase);
        let queued: Vec<String> = pending
            .queued_local_commit_ids
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert!(queued.contains(&first));
        assert!(queued.contains(&second));
        assert_eq!(repo.changes().get_conflicts().unwrap(), vec!["scene.ma"]);

        let resolver = repo.conflicts(&ctx);
        let outcome = resolver.resolve(ConflictHandling::TakeTheirs, None).unwrap();
        assert_eq!(outcome, ResolveOutcome::NextConflict);
        assert!(repo.is_rebasing());

        let outcome = resolver.resolve(ConflictHandling::TakeTheirs, None).unwrap();
        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));

        assert!(!repo.is_rebasing());
        assert!(repo.pending_operation().unwrap().is_none());
        assert_eq!(read(&alice, "scene.ma"), scene("bob"));

        let pruned: Vec<String> = host.pruned_ids().iter().map(|id| id.to_string()).collect();
        assert!(pruned.contains(&first));
        assert!(pruned.contains(&second));
    }

    #[test]
    fn take_ours_keeps_local_work_after_update() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        commit_all(&alice, "alice: edit");

        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);

        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert_eq!(read(&alice, "scene.ma"), scene("alice"));

        // Upstream is now an ancestor of the rebased work
        let log = run_git(&alice, &["log", "--format=%s"]);
        assert!(log.contains("bob: bob"));
        assert!(log.contains("alice: edit"));
    }

    #[test]
    fn cancel_restores_pre_update_head() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        let before = commit_all(&alice, "alice: edit");

        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);

        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::Cancel, None)
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::Canceled);
        assert!(repo.pending_operation().unwrap().is_none());
        assert_eq!(head(&alice), before);
        assert_eq!(read(&alice, "scene.ma"), scene("alice"));
    }

    #[test]
    fn details_name_both_sides() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        commit_all(&alice, "alice: edit");

        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);

        let details = repo
            .conflicts(&ctx)
            .conflict_details(&alice.join("scene.ma"))
            .unwrap()
            .expect("scene.ma is conflicted");
        assert!(details.is_text);
        assert!(details.current_entry.is_some());

        let untouched = repo
            .conflicts(&ctx)
            .conflict_details(&alice.join("missing.ma"))
            .unwrap();
        assert!(untouched.is_none());
    }
}

mod side_mapping {
    use super::*;

    /// `main` and `feature` both edit line 2 of the scene.
    fn diverged() -> LocalRepo {
        let local = LocalRepo::new();
        let dir = local.path();
        run_git(dir, &["checkout", "-q", "-b", "feature"]);
        write(dir, "scene.ma", &scene("feature"));
        commit_all(dir, "feature edit");
        run_git(dir, &["checkout", "-q", "main"]);
        write(dir, "scene.ma", &scene("main"));
        commit_all(dir, "main edit");
        local
    }

    #[test]
    fn merge_take_ours_keeps_current_branch() {
        let local = diverged();
        assert!(!try_git(local.path(), &["merge", "feature"]));

        let repo = local.open();
        assert!(repo.is_merging());
        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_merging());
        assert_eq!(read(local.path(), "scene.ma"), scene("main"));
    }

    #[test]
    fn merge_take_theirs_keeps_incoming_branch() {
        let local = diverged();
        assert!(!try_git(local.path(), &["merge", "feature"]));

        let repo = local.open();
        let (_host, ctx) = recording_host();
        repo.conflicts(&ctx)
            .resolve(ConflictHandling::TakeTheirs, None)
            .unwrap();
        assert_eq!(read(local.path(), "scene.ma"), scene("feature"));
    }

    #[test]
    fn rebase_take_ours_keeps_replayed_work() {
        let local = diverged();
        run_git(local.path(), &["checkout", "-q", "feature"]);
        assert!(!try_git(local.path(), &["rebase", "main"]));

        let repo = local.open();
        assert!(repo.is_rebasing());
        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert_eq!(read(local.path(), "scene.ma"), scene("feature"));
    }

    #[test]
    fn rebase_take_theirs_keeps_base() {
        let local = diverged();
        run_git(local.path(), &["checkout", "-q", "feature"]);
        assert!(!try_git(local.path(), &["rebase", "main"]));

        let repo = local.open();
        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeTheirs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_rebasing());
        assert_eq!(read(local.path(), "scene.ma"), scene("main"));
    }

    #[test]
    fn stash_take_ours_keeps_stashed_work() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "scene.ma", &scene("stashed"));

        let repo = local.open();
        assert!(repo.stash(false).unwrap());
        write(dir, "scene.ma", &scene("committed"));
        commit_all(dir, "committed edit");

        assert_eq!(repo.pop_stash(None).unwrap(), UpdateState::Conflict);
        assert!(!repo.is_merging());
        assert!(!repo.is_rebasing());

        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.changes().has_conflicts().unwrap());
        assert_eq!(read(dir, "scene.ma"), scene("stashed"));
    }

    #[test]
    fn partial_resolution_reports_remaining_conflicts() {
        let local = diverged();
        let dir = local.path();
        // A second conflicting file on both branches
        run_git(dir, &["checkout", "-q", "feature"]);
        write(dir, "rig.ma", "rig feature\n");
        commit_all(dir, "feature rig");
        run_git(dir, &["checkout", "-q", "main"]);
        write(dir, "rig.ma", "rig main\n");
        commit_all(dir, "main rig");
        assert!(!try_git(dir, &["merge", "feature"]));

        let repo = local.open();
        let (_host, ctx) = recording_host();
        let only_scene = vec!["scene.ma".to_string()];
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, Some(&only_scene))
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::StillConflicted);
        assert!(repo.is_merging());
        assert_eq!(repo.changes().get_conflicts().unwrap(), vec!["rig.ma"]);
    }
}

mod deleted_side {
    use super::*;

    /// `main` deletes the scene while `feature` edits it.
    fn merge_with_deleted_ours() -> LocalRepo {
        let local = LocalRepo::new();
        let dir = local.path();
        run_git(dir, &["checkout", "-q", "-b", "feature"]);
        write(dir, "scene.ma", &scene("feature"));
        commit_all(dir, "feature edit");
        run_git(dir, &["checkout", "-q", "main"]);
        run_git(dir, &["rm", "-q", "scene.ma"]);
        commit_all(dir, "main delete");
        assert!(!try_git(dir, &["merge", "feature"]));
        local
    }

    /// Alice deletes the scene locally while bob's edit is upstream.
    fn update_with_local_delete() -> SharedRepo {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");
        let alice = shared.alice();
        run_git(&alice, &["rm", "-q", "scene.ma"]);
        commit_all(&alice, "alice: delete scene");
        shared
    }

    #[test]
    fn merge_take_ours_removes_the_file() {
        let local = merge_with_deleted_ours();
        let repo = local.open();
        assert_eq!(repo.changes().get_conflicts().unwrap(), vec!["scene.ma"]);

        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_merging());
        assert!(!local.path().join("scene.ma").exists());
        assert!(run_git(local.path(), &["ls-files", "scene.ma"]).is_empty());
    }

    #[test]
    fn merge_take_theirs_keeps_the_edit() {
        let local = merge_with_deleted_ours();
        let repo = local.open();

        let (_host, ctx) = recording_host();
        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeTheirs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_merging());
        assert_eq!(read(local.path(), "scene.ma"), scene("feature"));
    }

    #[test]
    fn rebase_take_ours_keeps_the_deletion() {
        let shared = update_with_local_delete();
        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);
        assert_eq!(repo.changes().get_conflicts().unwrap(), vec!["scene.ma"]);

        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeOurs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_rebasing());
        let alice = shared.alice();
        assert!(!alice.join("scene.ma").exists());
        assert!(run_git(&alice, &["log", "--format=%s"]).contains("bob: bob"));
    }

    #[test]
    fn rebase_take_theirs_restores_the_upstream_edit() {
        let shared = update_with_local_delete();
        let repo = shared.open_alice();
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).update(&NullProgress), UpdateState::Conflict);

        let outcome = repo
            .conflicts(&ctx)
            .resolve(ConflictHandling::TakeTheirs, None)
            .unwrap();

        assert_eq!(outcome, ResolveOutcome::Completed(UpdateState::Ok));
        assert!(!repo.is_rebasing());
        assert!(repo.pending_operation().unwrap().is_none());
        assert_eq!(read(&shared.alice(), "scene.ma"), scene("bob"));
    }
}

mod push {
    use super::*;

    #[test]
    fn push_publishes_local_commits() {
        let shared = SharedRepo::new();
        let alice = shared.alice();
        write(&alice, "scene.ma", &scene("alice"));
        let local = commit_all(&alice, "alice: edit");

        let repo = shared.open_alice();
        assert!(repo.is_push_required().unwrap());
        let (_host, ctx) = recording_host();
        assert_eq!(repo.sync(&ctx).push(&NullProgress), UpdateState::Ok);

        assert!(!repo.is_push_required().unwrap());
        let bob = shared.bob();
        run_git(&bob, &["pull", "-q"]);
        assert_eq!(head(&bob), local);
    }

    #[test]
    fn rejected_push_is_an_error_state() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let alice = shared.alice();
        write(&alice, "notes.txt", "diverged\n");
        commit_all(&alice, "alice: notes");

        let repo = shared.open_alice();
        let (host, ctx) = recording_host();
        let state = repo.sync(&ctx).push(&NullProgress);

        assert_eq!(state, UpdateState::Error(SyncFailure::NonFastForward));
        let notes = host.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, NotifyKind::Error);
        assert_eq!(notes[0].1, SyncFailure::NonFastForward.title());
    }

    #[test]
    fn fetch_reports_pull_required() {
        let shared = SharedRepo::new();
        shared.bob_pushes_scene("bob");

        let repo = shared.open_alice();
        assert!(!repo.is_pull_required().unwrap());
        let (host, ctx) = recording_host();
        assert!(repo.sync(&ctx).fetch(&NullProgress).unwrap());
        assert!(repo.is_pull_required().unwrap());
        assert!(host.refresh_count() >= 1);
    }
}
