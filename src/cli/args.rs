//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::types::ConflictHandling;

/// vcb - git and LFS from the point of view of an artist's tool
#[derive(Parser, Debug)]
#[command(name = "vcb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if vcb was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    // ========== Repository ==========
    /// Create a repository in the current directory (or PATH)
    Init {
        /// Directory to initialize
        path: Option<PathBuf>,
    },

    /// Clone a remote repository
    #[command(
        long_about = "Clone a remote repository, streaming progress.\n\n\
            Rejected credentials are reported as such; any other failure removes \
            the partially created directory."
    )]
    Clone {
        /// Remote URL
        url: String,
        /// Destination directory
        path: PathBuf,
    },

    /// Check whether PATH (or an ancestor) is a repository
    IsRepo {
        /// Directory to probe
        path: Option<PathBuf>,
    },

    // ========== Inspection ==========
    /// Show pending changes and any paused operation
    Status {
        /// Show the staged set instead of the working tree
        #[arg(long)]
        staged: bool,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// List conflicted files, or describe one
    Conflicts {
        /// Conflicted file to describe
        path: Option<PathBuf>,
    },

    /// Show commit history
    History {
        /// Maximum number of entries
        #[arg(short = 'n', long)]
        max_count: Option<usize>,

        /// Entries to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Revision to walk instead of HEAD
        #[arg(long = "ref")]
        rev: Option<String>,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// List local and remote branches
    Branches,

    // ========== Staging ==========
    /// Stage files
    Stage {
        /// Files to stage
        #[arg(required_unless_present = "all")]
        paths: Vec<String>,

        /// Stage everything
        #[arg(long, conflicts_with = "paths")]
        all: bool,
    },

    /// Unstage files, keeping their content
    Unstage {
        /// Files to unstage
        #[arg(required_unless_present = "all")]
        paths: Vec<String>,

        /// Unstage everything
        #[arg(long, conflicts_with = "paths")]
        all: bool,
    },

    /// Make the staged set exactly the given files
    SyncStaged {
        /// Files that should be staged
        paths: Vec<String>,
    },

    /// Commit the staged files
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    // ========== Synchronization ==========
    /// Download remote changes without applying them
    Fetch,

    /// Upload local commits
    Push,

    /// Pull remote changes, replaying local commits on top
    #[command(
        long_about = "Pull remote changes and rebase local commits onto them.\n\n\
            Refuses to run while tracked files have uncommitted changes. If a local \
            commit conflicts with the remote, the update pauses; finish it with \
            `vcb resolve`.",
        after_help = "\
WORKFLOW EXAMPLES:
    vcb update
    vcb conflicts
    vcb resolve ours scenes/shot.ma
    vcb resolve theirs"
    )]
    Update,

    /// Resolve conflicts of a paused update, merge, or stash
    #[command(
        long_about = "Resolve conflicts of a paused update, merge, or stash.\n\n\
            `ours` keeps your local work and `theirs` keeps the incoming work, \
            whether the tool is merging or rebasing. Without paths every conflicted \
            file is resolved. When resolving completes one replayed commit and the \
            next one conflicts too, run resolve again."
    )]
    Resolve {
        /// How to resolve
        #[arg(value_enum)]
        handling: HandlingArg,

        /// Files to resolve (default: all conflicted files)
        paths: Vec<String>,
    },

    // ========== Large files ==========
    /// Large-file tracking
    Lfs {
        #[command(subcommand)]
        action: LfsAction,
    },

    /// Generate shell completion scripts
    #[command(
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    vcb completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    vcb completion zsh >> ~/.zshrc"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Large-file subcommands.
#[derive(Subcommand, Debug)]
pub enum LfsAction {
    /// Track binary files among PATHS (the whole tree when omitted)
    TrackBinaries {
        paths: Vec<PathBuf>,
    },

    /// List tracked patterns
    Tracked,

    /// Check whether a file may take a binary lock
    Lockable {
        path: PathBuf,
    },

    /// Resolve files to their cached content, fetching when missing
    Load {
        paths: Vec<PathBuf>,

        /// Revision to load from
        #[arg(long = "ref")]
        rev: Option<String>,

        /// Check cached content against its hash
        #[arg(long)]
        verify: bool,
    },

    /// Delete cached large files the server already has
    Prune {
        /// Keep objects referenced by commits from the last N days
        #[arg(long, value_name = "N", conflicts_with = "force")]
        recent_days: Option<u32>,

        /// Drop every cached object not needed by unpushed commits
        #[arg(long)]
        force: bool,
    },
}

/// Conflict handling as typed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlingArg {
    Cancel,
    External,
    Ours,
    Theirs,
}

impl From<HandlingArg> for ConflictHandling {
    fn from(arg: HandlingArg) -> Self {
        match arg {
            HandlingArg::Cancel => ConflictHandling::Cancel,
            HandlingArg::External => ConflictHandling::External,
            HandlingArg::Ours => ConflictHandling::TakeOurs,
            HandlingArg::Theirs => ConflictHandling::TakeTheirs,
        }
    }
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
