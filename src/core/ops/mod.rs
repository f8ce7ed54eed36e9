//! core::ops
//!
//! Operation locking and the pending-update journal.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive per-repository operation lock
//! - [`journal`] - Local commits queued by an update paused on conflicts
//!
//! # Example
//!
//! ```ignore
//! use vcbridge::core::ops::lock::RepoLock;
//!
//! let lock = RepoLock::acquire(&paths, "track")?;
//! // ... mutate index or tracked-patterns file ...
//! drop(lock);
//! ```

pub mod journal;
pub mod lock;
