//! resolve command - finish or abort a paused operation

use anyhow::{bail, Result};

use super::{absolute_paths, run_operation};
use crate::cli::Context;
use crate::core::types::ConflictHandling;
use crate::ui::output;
use crate::vc::ResolveOutcome;

pub fn resolve(ctx: &Context, handling: ConflictHandling, paths: Vec<String>) -> Result<()> {
    let paths = absolute_paths(ctx, paths)?;
    let outcome = run_operation(ctx, "resolve", move |repo, host, _| {
        if !repo.changes().has_conflicts()? && repo.pending_operation()?.is_none() {
            return Ok(None);
        }
        let paths: Vec<String> = paths.iter().map(|p| repo.paths().relative(p)).collect();
        let paths = (!paths.is_empty()).then_some(paths);
        Ok(Some(repo.conflicts(host).resolve(handling, paths.as_deref())?))
    })?;
    let Some(outcome) = outcome else {
        bail!("nothing to resolve");
    };

    let verbosity = ctx.verbosity();
    match outcome {
        ResolveOutcome::StillConflicted => {
            output::print("Some files are still conflicted", verbosity);
        }
        ResolveOutcome::NextConflict => {
            output::print(
                "The next local change conflicts too; run `vcb resolve` again",
                verbosity,
            );
        }
        ResolveOutcome::ExternalLaunched => {
            output::print("Merge tool finished; run `vcb status` to check", verbosity);
        }
        ResolveOutcome::Canceled => output::print("Update canceled", verbosity),
        ResolveOutcome::Completed(_) => {}
    }
    Ok(())
}
