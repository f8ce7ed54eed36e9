//! Shared fixtures for integration tests.
//!
//! Every fixture lives in a `TempDir`: a bare repository acting as the
//! remote, and working copies created with the real `git` CLI.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use tempfile::TempDir;

use vcbridge::host::mock::RecordingHost;
use vcbridge::host::HostContext;
use vcbridge::vc::Repository;

/// Run git in `dir`, panicking on failure. Returns stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = git_output(dir, args);
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Run git in `dir`, returning whether it succeeded.
pub fn try_git(dir: &Path, args: &[&str]) -> bool {
    git_output(dir, args).status.success()
}

fn git_output(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git")
}

/// Identity and non-interactive editors for a fresh working copy.
pub fn configure(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "core.editor", "true"]);
    run_git(dir, &["config", "sequence.editor", "true"]);
}

pub fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

pub fn commit_all(dir: &Path, message: &str) -> String {
    run_git(dir, &["add", "-A"]);
    run_git(dir, &["commit", "-q", "-m", message]);
    head(dir)
}

pub fn head(dir: &Path) -> String {
    run_git(dir, &["rev-parse", "HEAD"]).trim().to_string()
}

/// A scene file with distinct lines so edits to one line conflict.
pub fn scene(line2: &str) -> String {
    format!("//Maya ASCII scene\ncreateNode transform -n \"{line2}\";\nrequires maya \"2024\";\n")
}

pub fn recording_host() -> (Arc<RecordingHost>, HostContext) {
    let host = Arc::new(RecordingHost::new());
    let ctx = HostContext::new(host.clone(), "Git");
    (host, ctx)
}

/// One local repository without a remote, on `main` with one commit.
pub struct LocalRepo {
    dir: TempDir,
}

impl LocalRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q", "-b", "main"]);
        configure(dir.path());
        write(dir.path(), "scene.ma", &scene("base"));
        commit_all(dir.path(), "Initial commit");
        Self { dir }
    }

    /// An empty repository with no commits.
    pub fn unborn() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q", "-b", "main"]);
        configure(dir.path());
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn open(&self) -> Repository {
        Repository::load(self.path()).expect("failed to load repository")
    }
}

/// A bare remote with two working copies: `alice` and `bob`.
pub struct SharedRepo {
    dir: TempDir,
}

impl SharedRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path();
        run_git(root, &["init", "-q", "--bare", "-b", "main", "remote.git"]);

        let alice = root.join("alice");
        fs::create_dir_all(&alice).unwrap();
        run_git(&alice, &["init", "-q", "-b", "main"]);
        configure(&alice);
        write(&alice, "scene.ma", &scene("base"));
        commit_all(&alice, "Initial commit");
        let remote = root.join("remote.git");
        run_git(&alice, &["remote", "add", "origin", remote.to_str().unwrap()]);
        run_git(&alice, &["push", "-q", "-u", "origin", "main"]);

        run_git(root, &["clone", "-q", remote.to_str().unwrap(), "bob"]);
        configure(&root.join("bob"));

        Self { dir }
    }

    pub fn alice(&self) -> PathBuf {
        self.dir.path().join("alice")
    }

    pub fn bob(&self) -> PathBuf {
        self.dir.path().join("bob")
    }

    pub fn open_alice(&self) -> Repository {
        Repository::load(&self.alice()).expect("failed to load alice")
    }

    /// Bob changes line 2 of the scene and pushes.
    pub fn bob_pushes_scene(&self, line2: &str) -> String {
        let bob = self.bob();
        write(&bob, "scene.ma", &scene(line2));
        let id = commit_all(&bob, &format!("bob: {line2}"));
        run_git(&bob, &["push", "-q", "origin", "main"]);
        id
    }
}
