//! fetch, push, update commands

use anyhow::{bail, Result};

use super::run_operation;
use crate::cli::Context;
use crate::core::types::UpdateState;
use crate::ui::output;

pub fn fetch(ctx: &Context) -> Result<()> {
    let fetched = run_operation(ctx, "fetch", |repo, host, cancel| {
        let progress = host.progress(cancel);
        match repo.sync(host).fetch(&progress) {
            Ok(done) => Ok(done),
            Err(e) => {
                host.notify_failure(&e.to_sync_failure());
                Err(e.into())
            }
        }
    })?;
    if !fetched {
        output::print("Fetch canceled", ctx.verbosity());
    }
    Ok(())
}

pub fn push(ctx: &Context) -> Result<()> {
    let state = run_operation(ctx, "push", |repo, host, cancel| {
        let progress = host.progress(cancel);
        Ok(repo.sync(host).push(&progress))
    })?;
    report(ctx, state)
}

pub fn update(ctx: &Context) -> Result<()> {
    let state = run_operation(ctx, "update", |repo, host, cancel| {
        let progress = host.progress(cancel);
        Ok(repo.sync(host).update(&progress))
    })?;
    report(ctx, state)
}

/// Notifications already told the user what happened; only errors change
/// the exit status.
fn report(ctx: &Context, state: UpdateState) -> Result<()> {
    match state {
        UpdateState::Error(failure) if !failure.is_informational() => bail!("{}", failure.title()),
        UpdateState::Conflict => {
            output::print(
                "Run `vcb conflicts` to inspect and `vcb resolve` to finish the update",
                ctx.verbosity(),
            );
            Ok(())
        }
        UpdateState::Cancel => {
            output::print("Canceled", ctx.verbosity());
            Ok(())
        }
        _ => Ok(()),
    }
}
