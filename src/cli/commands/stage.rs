//! stage, unstage, sync-staged, commit commands

use std::path::PathBuf;

use anyhow::Result;

use super::{absolute_paths, run_operation};
use crate::cli::Context;
use crate::ui::output;
use crate::vc::Repository;

fn relative_to(repo: &Repository, paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| repo.paths().relative(p)).collect()
}

pub fn stage(ctx: &Context, paths: Vec<String>, all: bool) -> Result<()> {
    let paths = absolute_paths(ctx, paths)?;
    run_operation(ctx, "stage", move |repo, _, _| {
        if all {
            repo.staging().stage_all()?;
        } else {
            repo.staging().stage(&relative_to(repo, &paths))?;
        }
        Ok(())
    })
}

pub fn unstage(ctx: &Context, paths: Vec<String>, all: bool) -> Result<()> {
    let paths = absolute_paths(ctx, paths)?;
    run_operation(ctx, "unstage", move |repo, _, _| {
        if all {
            repo.staging().unstage_all()?;
        } else {
            repo.staging().unstage(&relative_to(repo, &paths))?;
        }
        Ok(())
    })
}

/// Make the staged set exactly `paths`.
pub fn sync_staged(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let paths = absolute_paths(ctx, paths)?;
    run_operation(ctx, "sync-staged", move |repo, _, _| {
        repo.staging().sync_staged_files(&relative_to(repo, &paths))?;
        Ok(())
    })
}

pub fn commit(ctx: &Context, message: String) -> Result<()> {
    let verbosity = ctx.verbosity();
    let committed = run_operation(ctx, "commit", move |repo, host, _| {
        let committed = repo.commit(&message)?;
        if committed {
            host.refresh_history();
        }
        Ok(committed)
    })?;
    if committed {
        output::success("Committed staged files", verbosity);
    } else {
        output::print("Nothing to commit", verbosity);
    }
    Ok(())
}
