//! status, conflicts, history, branches commands - read-only

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{host_context, open_repository};
use crate::cli::Context;
use crate::core::types::HistoryEntry;
use crate::ui::output;

/// Show pending changes.
pub fn status(ctx: &Context, staged: bool, json: bool) -> Result<()> {
    let repo = open_repository(ctx)?;
    let changes = repo
        .changes()
        .get_pending_changes(staged)
        .context("failed to read changes")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    let verbosity = ctx.verbosity();
    let branch = repo
        .current_branch_name()?
        .unwrap_or_else(|| "(detached)".to_string());
    output::print(format!("On branch {branch}"), verbosity);
    if let Some(pending) = repo.pending_operation()? {
        output::warn(output::format_pending(&pending), verbosity);
    }
    let conflicts = repo.changes().get_conflicts()?;
    if !conflicts.is_empty() {
        output::print("Conflicted Files:", verbosity);
        output::print(output::format_list(&conflicts, "  "), verbosity);
    }
    output::print(&changes, verbosity);
    Ok(())
}

/// List conflicted files, or describe one.
pub fn conflicts(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let repo = open_repository(ctx)?;
    let verbosity = ctx.verbosity();

    let Some(path) = path else {
        let conflicts = repo.changes().get_conflicts()?;
        if conflicts.is_empty() {
            output::print("No conflicts", verbosity);
        } else {
            output::print(output::format_list(&conflicts, ""), verbosity);
        }
        return Ok(());
    };

    let host = host_context(ctx);
    let path = ctx.working_dir()?.join(path);
    let Some(details) = repo.conflicts(&host).conflict_details(&path)? else {
        output::print(format!("{} is not conflicted", path.display()), verbosity);
        return Ok(());
    };

    output::print(&details.path, verbosity);
    let describe = |label: &str, branch: &str, entry: Option<&HistoryEntry>| match entry {
        Some(entry) => format!(
            "  {label} ({branch}): {}",
            output::format_history_entry(entry).trim()
        ),
        None => format!("  {label} ({branch})"),
    };
    output::print(
        describe("current", &details.current_branch, details.current_entry.as_ref()),
        verbosity,
    );
    output::print(
        describe("incoming", &details.incoming_branch, details.incoming_entry.as_ref()),
        verbosity,
    );
    if !details.is_text {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(not cached)".to_string())
        };
        output::print("  large file conflict", verbosity);
        output::print(format!("    current:  {}", show(&details.current_cached_path)), verbosity);
        output::print(format!("    incoming: {}", show(&details.incoming_cached_path)), verbosity);
    }
    Ok(())
}

/// Show commit history, newest first; remote-only entries last.
pub fn history(
    ctx: &Context,
    max_count: Option<usize>,
    skip: usize,
    rev: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(ctx)?;
    let entries = repo.get_history(max_count, skip, rev)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        output::print(output::format_history_entry(entry), ctx.verbosity());
    }
    Ok(())
}

pub fn branches(ctx: &Context) -> Result<()> {
    let repo = open_repository(ctx)?;
    let current = repo.current_branch_name()?;
    for branch in repo.branches()? {
        output::print(
            output::format_branch(&branch, current.as_deref()),
            ctx.verbosity(),
        );
    }
    Ok(())
}
