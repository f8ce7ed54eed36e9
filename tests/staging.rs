//! Staging, pending changes and history on a local working copy.

mod common;

use common::*;

mod pending_changes {
    use super::*;

    #[test]
    fn workdir_changes_are_sorted_into_one_sequence_each() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "doomed.ma", "to be deleted\n");
        commit_all(dir, "add doomed");

        write(dir, "scene.ma", &scene("edited"));
        write(dir, "textures/new.png", "\u{89}PNG");
        std::fs::remove_file(dir.join("doomed.ma")).unwrap();

        let repo = local.open();
        let changes = repo.changes().get_pending_changes(false).unwrap();

        assert!(changes.is_disjoint());
        assert_eq!(changes.size(), 3);
        assert_eq!(changes.modified_files[0].path, "scene.ma");
        assert_eq!(changes.new_files[0].path, "textures/new.png");
        assert_eq!(changes.deleted_files[0].path, "doomed.ma");
        assert!(repo.changes().has_pending_changes(false).unwrap());
    }

    #[test]
    fn untracked_only_counts_when_asked() {
        let local = LocalRepo::new();
        write(local.path(), "scratch.txt", "notes\n");

        let repo = local.open();
        assert!(!repo.changes().has_pending_changes(false).unwrap());
        assert!(repo.changes().has_pending_changes(true).unwrap());
    }

    #[test]
    fn staged_rename_keeps_old_path() {
        let local = LocalRepo::new();
        let dir = local.path();
        run_git(dir, &["mv", "scene.ma", "shot010.ma"]);

        let repo = local.open();
        let staged = repo.changes().get_pending_changes(true).unwrap();

        assert_eq!(staged.renamed_files.len(), 1);
        let rename = &staged.renamed_files[0];
        assert_eq!(rename.path, "shot010.ma");
        assert_eq!(rename.old_path.as_deref(), Some("scene.ma"));
        assert!(staged.deleted_files.is_empty());
        assert!(staged.new_files.is_empty());
    }

    #[test]
    fn unborn_branch_stages_against_empty_tree() {
        let local = LocalRepo::unborn();
        write(local.path(), "scene.ma", &scene("first"));

        let repo = local.open();
        assert!(repo.is_unborn());
        repo.staging().stage(&["scene.ma".to_string()]).unwrap();

        let staged = repo.changes().get_pending_changes(true).unwrap();
        assert_eq!(staged.paths(), vec!["scene.ma"]);

        repo.staging().unstage(&["scene.ma".to_string()]).unwrap();
        assert!(repo.changes().get_pending_changes(true).unwrap().is_empty());
    }
}

mod staging {
    use super::*;

    #[test]
    fn stage_then_unstage_round_trip() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "scene.ma", &scene("edited"));
        write(dir, "rig.ma", "rig\n");

        let repo = local.open();
        let staging = repo.staging();
        staging
            .stage(&["scene.ma".to_string(), "rig.ma".to_string()])
            .unwrap();
        let mut staged = repo.changes().get_pending_changes(true).unwrap().paths();
        staged.sort();
        assert_eq!(staged, vec!["rig.ma", "scene.ma"]);

        staging.unstage(&["rig.ma".to_string()]).unwrap();
        assert_eq!(
            repo.changes().get_pending_changes(true).unwrap().paths(),
            vec!["scene.ma"]
        );
        // Unstaging keeps the working-tree content
        assert_eq!(read(dir, "rig.ma"), "rig\n");
    }

    #[test]
    fn staging_a_deletion() {
        let local = LocalRepo::new();
        let dir = local.path();
        std::fs::remove_file(dir.join("scene.ma")).unwrap();

        let repo = local.open();
        repo.staging().stage(&["scene.ma".to_string()]).unwrap();

        let staged = repo.changes().get_pending_changes(true).unwrap();
        assert_eq!(staged.deleted_files.len(), 1);
        assert_eq!(staged.deleted_files[0].path, "scene.ma");
    }

    #[test]
    fn sync_staged_replaces_the_staged_set() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "a.ma", "a\n");
        write(dir, "b.ma", "b\n");
        write(dir, "c.ma", "c\n");

        let repo = local.open();
        repo.staging()
            .stage(&["a.ma".to_string(), "b.ma".to_string()])
            .unwrap();
        repo.staging()
            .sync_staged_files(&["b.ma".to_string(), "c.ma".to_string()])
            .unwrap();

        let mut staged = repo.changes().get_pending_changes(true).unwrap().paths();
        staged.sort();
        assert_eq!(staged, vec!["b.ma", "c.ma"]);
    }

    #[test]
    fn commit_requires_staged_content() {
        let local = LocalRepo::new();
        let dir = local.path();
        let repo = local.open();

        assert!(!repo.commit("nothing here").unwrap());

        write(dir, "scene.ma", &scene("edited"));
        repo.staging().stage_all().unwrap();
        assert!(repo.commit("Edit scene").unwrap());

        let history = repo.get_history(Some(1), 0, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message.trim(), "Edit scene");
        assert!(!repo.changes().has_pending_changes(true).unwrap());
    }

    #[test]
    fn restore_discards_working_tree_edits() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "scene.ma", &scene("oops"));

        let repo = local.open();
        repo.restore_files(&["scene.ma".to_string()]).unwrap();
        assert_eq!(read(dir, "scene.ma"), scene("base"));
    }
}

mod history {
    use super::*;

    #[test]
    fn newest_first_with_skip() {
        let local = LocalRepo::new();
        let dir = local.path();
        for n in 1..=3 {
            write(dir, "scene.ma", &scene(&format!("v{n}")));
            commit_all(dir, &format!("version {n}"));
        }

        let repo = local.open();
        let all = repo.get_history(None, 0, None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].message.trim(), "version 3");

        let page = repo.get_history(Some(2), 1, None).unwrap();
        let messages: Vec<&str> = page.iter().map(|e| e.message.trim()).collect();
        assert_eq!(messages, vec!["version 2", "version 1"]);
    }

    #[test]
    fn last_entry_for_file() {
        let local = LocalRepo::new();
        let dir = local.path();
        write(dir, "rig.ma", "rig\n");
        commit_all(dir, "add rig");
        write(dir, "scene.ma", &scene("later"));
        commit_all(dir, "touch scene");

        let repo = local.open();
        let entry = repo
            .get_last_history_entry_for_file("rig.ma", None)
            .unwrap()
            .expect("rig.ma has history");
        assert_eq!(entry.message.trim(), "add rig");
        assert!(repo
            .get_last_history_entry_for_file("missing.ma", None)
            .unwrap()
            .is_none());
    }
}
