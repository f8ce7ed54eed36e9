//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository the context points at
//! 2. Calls the matching component, through a worker when it mutates
//! 3. Formats and displays output
//!
//! Mutating commands run under the repository's operation lock, so a second
//! `vcb` invocation against the same working copy fails fast instead of
//! interleaving index writes.

mod completion;
mod lfs;
mod repo;
mod resolve;
mod stage;
mod status;
mod sync;

pub use completion::completion;
pub use repo::{clone, init, is_repo};
pub use resolve::resolve;
pub use stage::{commit, stage, sync_staged, unstage};
pub use status::{branches, conflicts, history, status};
pub use sync::{fetch, push, update};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};

use crate::cli::args::{Command, LfsAction};
use crate::cli::{Context, TerminalHost};
use crate::core::paths::GIT_DIR_NAME;
use crate::host::HostContext;
use crate::progress::CancelFlag;
use crate::vc::Repository;
use crate::worker;

/// History channel the terminal host reports to.
pub const CHANNEL_ID: &str = "Git";

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { path } => repo::init(ctx, path.as_deref()),
        Command::Clone { url, path } => repo::clone(ctx, &url, &path),
        Command::IsRepo { path } => repo::is_repo(ctx, path.as_deref()),

        Command::Status { staged, json } => status::status(ctx, staged, json),
        Command::Conflicts { path } => status::conflicts(ctx, path.as_deref()),
        Command::History {
            max_count,
            skip,
            rev,
            json,
        } => status::history(ctx, max_count, skip, rev.as_deref(), json),
        Command::Branches => status::branches(ctx),

        Command::Stage { paths, all } => stage::stage(ctx, paths, all),
        Command::Unstage { paths, all } => stage::unstage(ctx, paths, all),
        Command::SyncStaged { paths } => stage::sync_staged(ctx, paths),
        Command::Commit { message } => stage::commit(ctx, message),

        Command::Fetch => sync::fetch(ctx),
        Command::Push => sync::push(ctx),
        Command::Update => sync::update(ctx),
        Command::Resolve { handling, paths } => resolve::resolve(ctx, handling.into(), paths),

        Command::Lfs { action } => match action {
            LfsAction::TrackBinaries { paths } => lfs::track_binaries(ctx, paths),
            LfsAction::Tracked => lfs::tracked(ctx),
            LfsAction::Lockable { path } => lfs::lockable(ctx, &path),
            LfsAction::Load { paths, rev, verify } => lfs::load(ctx, paths, rev, verify),
            LfsAction::Prune { recent_days, force } => lfs::prune(ctx, recent_days, force),
        },

        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Open the repository containing the context's working directory.
pub(crate) fn open_repository(ctx: &Context) -> Result<Repository> {
    let dir = ctx.working_dir()?;
    let root = dir
        .ancestors()
        .find(|d| d.join(GIT_DIR_NAME).exists())
        .ok_or_else(|| anyhow!("not a repository: {}", dir.display()))?;
    Repository::load(root).ok_or_else(|| anyhow!("cannot open repository at {}", root.display()))
}

/// Join command-line paths to the working directory. Handlers make the
/// results repository-relative once the repository is open.
pub(crate) fn absolute_paths(ctx: &Context, paths: Vec<String>) -> Result<Vec<PathBuf>> {
    let cwd = ctx.working_dir()?;
    Ok(paths.into_iter().map(|p| cwd.join(p)).collect())
}

/// A host context printing to this terminal.
pub(crate) fn host_context(ctx: &Context) -> HostContext {
    HostContext::new(Arc::new(TerminalHost::new(ctx.verbosity())), CHANNEL_ID)
}

/// Run `op` on a worker thread holding the repository's operation lock.
pub(crate) fn run_operation<T, F>(ctx: &Context, name: &str, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Repository, &HostContext, CancelFlag) -> Result<T> + Send + 'static,
{
    let repo = open_repository(ctx)?;
    let host = host_context(ctx);
    let root = repo.root_path().to_path_buf();
    let handle = worker::spawn_operation(&root, name, move |cancel| op(&repo, &host, cancel))
        .with_context(|| format!("cannot start {name}"))?;
    handle.join()?
}
