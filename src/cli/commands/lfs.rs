//! lfs subcommands - large-file tracking

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{open_repository, run_operation};
use crate::cli::Context;
use crate::host::NotifyKind;
use crate::ui::output;
use crate::vc::lfs::parse_pointer;

/// Track binaries among `paths`, or in the whole working tree.
pub fn track_binaries(ctx: &Context, paths: Vec<PathBuf>) -> Result<()> {
    let cwd = ctx.working_dir()?;
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| cwd.join(p)).collect();

    let scan = run_operation(ctx, "track", move |repo, _, _| {
        let lfs = repo.lfs();
        let scan = if paths.is_empty() {
            lfs.track_all_binaries(None, None)?
        } else {
            lfs.track_binaries(&paths, None)?
        };
        Ok(scan)
    })?;

    let verbosity = ctx.verbosity();
    if scan.extension_set.is_empty() && scan.path_set.is_empty() {
        output::print("No binary files found", verbosity);
        return Ok(());
    }
    for ext in &scan.extension_set {
        output::print(format!("*.{ext}"), verbosity);
    }
    for path in &scan.path_set {
        output::print(path, verbosity);
    }
    Ok(())
}

pub fn tracked(ctx: &Context) -> Result<()> {
    let repo = open_repository(ctx)?;
    let tracker = repo.lfs().extension_tracker()?;
    if !tracker.patterns().is_empty() {
        output::print(output::format_list(tracker.patterns(), ""), ctx.verbosity());
    }
    Ok(())
}

pub fn lockable(ctx: &Context, path: &Path) -> Result<()> {
    let repo = open_repository(ctx)?;
    let path = ctx.working_dir()?.join(path);
    println!("{}", repo.lfs().is_lockable(&path)?);
    Ok(())
}

/// Print `path<TAB>cached object` for each file, fetching missing objects.
pub fn load(ctx: &Context, paths: Vec<PathBuf>, rev: Option<String>, verify: bool) -> Result<()> {
    let cwd = ctx.working_dir()?;
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| cwd.join(p)).collect();
    let verbosity = ctx.verbosity();

    let loaded = run_operation(ctx, "load", move |repo, _, _| {
        let lfs = repo.lfs();
        let rev = rev.as_deref().unwrap_or("HEAD");
        let mut rows = Vec::new();
        for change in lfs.load_files(&paths, Some(rev))? {
            let intact = match (&change.cached_path, verify) {
                (Some(cached), true) => {
                    let pointer = repo
                        .git()
                        .blob_at(rev, &change.path)?
                        .and_then(|blob| parse_pointer(&blob));
                    match pointer {
                        Some(pointer) => Some(lfs.verify_cached(&pointer)?),
                        None => Some(Path::new(cached).is_file()),
                    }
                }
                _ => None,
            };
            rows.push((change, intact));
        }
        Ok(rows)
    })?;

    for (change, intact) in loaded {
        let cached = change.cached_path.as_deref().unwrap_or("(unavailable)");
        let line = match intact {
            Some(true) => format!("{}\t{}\tok", change.path, cached),
            Some(false) => format!("{}\t{}\tCORRUPT", change.path, cached),
            None => format!("{}\t{}", change.path, cached),
        };
        output::print(line, verbosity);
    }
    Ok(())
}

/// Prune the cache; the default retention reports through the host.
pub fn prune(ctx: &Context, recent_days: Option<u32>, force: bool) -> Result<()> {
    run_operation(ctx, "prune", move |repo, host, _| {
        if recent_days.is_none() && !force {
            repo.lfs().clear_cache(host)?;
        } else {
            let count = repo.lfs().prune(recent_days, force)?;
            host.notify(NotifyKind::Info, "Cache cleared", &format!("Cleared {count} objects"));
        }
        Ok(())
    })
}
