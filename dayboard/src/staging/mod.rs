//! Optimistic mutation staging
//!
//! Local edits are recorded as patches, merged over the last confirmed list
//! for rendering, and committed in one batch once a debounce window passes.

pub mod cache;
pub mod entity;
pub mod merge;
pub mod patch;
pub mod scheduler;
pub mod undo;

pub use cache::{CacheMirror, CacheSnapshot};
pub use entity::{from_fields, id_from_value, to_fields, Entity, Fields};
pub use merge::apply_staged;
pub use patch::{Patch, PatchStore, Staged};
pub use scheduler::{CommitScheduler, SchedulerPhase};
pub use undo::UndoSnapshot;
