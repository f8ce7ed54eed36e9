//! vc
//!
//! The repository model: one handle per working copy and the components it
//! hands out.
//!
//! ```text
//! Repository ──┬── changes()   ChangeInspector   read-only status
//!              ├── staging()   StagingController index mutations
//!              ├── sync()      SyncEngine        fetch / push / update
//!              ├── conflicts() ConflictResolver  paused merge or rebase
//!              └── lfs()       LfsTracker        large-file policy
//! ```

mod changes;
mod conflicts;
pub mod lfs;
mod repository;
mod staging;
mod sync;

pub use changes::ChangeInspector;
pub use conflicts::{ConflictDetails, ConflictResolver, ResolveOutcome};
pub use lfs::{BinaryScan, LfsError, LfsTracker};
pub use repository::Repository;
pub use staging::StagingController;
pub use sync::SyncEngine;
