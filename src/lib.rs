//! vcbridge - git and LFS for host applications
//!
//! vcbridge wraps the git CLI, git-lfs, and libgit2 behind a repository model
//! a host application (a DCC plugin, a launcher, the `vcb` terminal binary)
//! can drive without knowing git: inspect and stage changes, fetch, push and
//! update, resolve conflicts, and decide which files are stored as large-file
//! pointers.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface; the terminal acts as the host
//! - [`vc`] - Repository handle and its components
//! - [`worker`] - Background operations under a per-repository lock
//! - [`host`] - Callbacks into the surrounding application
//! - [`git`] - Single interface for all git access
//! - [`core`] - Domain types, paths, configuration, journal
//! - [`progress`] - Progress sinks and cancellation
//! - [`ui`] - Terminal output
//!
//! # Correctness Invariants
//!
//! 1. Repository state is re-read from disk on every query, never cached
//! 2. Only one mutating operation runs per working copy
//! 3. Conflicts are a paused state, not an error
//! 4. A canceled operation never leaves a half-finished rebase behind

pub mod cli;
pub mod core;
pub mod git;
pub mod host;
pub mod progress;
pub mod ui;
pub mod vc;
pub mod worker;
