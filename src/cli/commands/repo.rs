//! init, clone, is-repo commands

use std::path::Path;

use anyhow::{Context as _, Result};

use super::host_context;
use crate::cli::Context;
use crate::core::config::Config;
use crate::progress::CancelFlag;
use crate::ui::output;
use crate::vc::Repository;

/// Create a repository in `path` (the working directory by default).
pub fn init(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let dir = resolve(ctx, path)?;
    let config = Config::load(None).context("failed to load configuration")?;
    let repo = Repository::create(&dir, &config)
        .with_context(|| format!("cannot create repository in {}", dir.display()))?;
    output::success(
        format!("Initialized repository in {}", repo.root_path().display()),
        ctx.verbosity(),
    );
    Ok(())
}

/// Clone `url` into `path`.
pub fn clone(ctx: &Context, url: &str, path: &Path) -> Result<()> {
    let dest = resolve(ctx, Some(path))?;
    let config = Config::load(None).context("failed to load configuration")?;
    let host = host_context(ctx);
    let progress = host.progress(CancelFlag::new());

    let repo = Repository::clone(url, &dest, &config, &progress)
        .with_context(|| format!("cannot clone {url}"))?;
    output::success(
        format!("Cloned {} into {}", url, repo.root_path().display()),
        ctx.verbosity(),
    );
    Ok(())
}

/// Print whether `path` (the working directory by default) is inside a
/// repository.
pub fn is_repo(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let dir = resolve(ctx, path)?;
    println!("{}", Repository::is_repo(&dir));
    Ok(())
}

fn resolve(ctx: &Context, path: Option<&Path>) -> Result<std::path::PathBuf> {
    let cwd = ctx.working_dir()?;
    Ok(match path {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
        None => cwd,
    })
}
