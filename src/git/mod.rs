//! git
//!
//! Single doorway to the external tool.
//!
//! # Architecture
//!
//! All repository access flows through this module. No other module imports
//! `git2` or spawns the tool.
//!
//! - Reads (state, index conflicts, differences, history, branches) go
//!   through git2 in [`Git`]
//! - Writes and network operations (add, restore, checkout, rebase, pull,
//!   push, stash, lfs) run the tool as a subprocess through [`GitRunner`],
//!   whose hooks, filters, and credential helpers then behave exactly as they
//!   do for the user
//!
//! # Invariants
//!
//! - No query result is cached; the on-disk state is re-read every call
//! - Subprocess failures are classified by [`classify_stderr`] only

mod command;
mod error;
mod interface;
mod progress;

pub use command::{command_exists, CommandOutput, GitRunner, StreamOutcome};
pub use error::{classify_stderr, GitError, StderrClass};
pub use interface::{CommitInfo, ConflictEntry, FileDelta, Git, GitState};
pub use progress::{parse_progress_line, LineSplitter, ProgressUpdate};
