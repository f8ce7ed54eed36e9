//! core
//!
//! Core domain types, paths, configuration, and operation bookkeeping.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CommitId, ChangeSet, UpdateState, PendingOperation, etc.
//! - [`paths`] - Centralized path routing for bridge and tool storage
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Operation lock and pending-update journal
//!
//! # Design Principles
//!
//! - Nothing here caches repository state; the tool's on-disk state can
//!   change from outside this process at any time
//! - Strong typing at the boundary (ids validated on construction)

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
