//! cli
//!
//! Command-line interface for vcb.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Act as the host: print progress and notifications to the terminal
//! - Delegate to the [`crate::vc`] components, running mutating operations
//!   through [`crate::worker`]
//!
//! The CLI layer is thin; it owns no repository logic.

pub mod args;
pub mod commands;
mod host;

pub use args::{Cli, Shell};
pub use host::TerminalHost;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::ui::output::Verbosity;

/// Execution context shared by command handlers.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub cwd: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    /// The directory commands run in, always absolute.
    pub fn working_dir(&self) -> Result<PathBuf> {
        let current = std::env::current_dir().context("cannot determine current directory")?;
        Ok(match &self.cwd {
            Some(cwd) => current.join(cwd),
            None => current,
        })
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Run the CLI application with already parsed arguments.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };
    commands::dispatch(cli.command, &ctx)
}
