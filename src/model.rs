//! Core data model.
//!
//! A work item is an email or a task derived from one. Batches run an
//! operation over many items; dedup groups and merges same-category tasks.

pub mod batch;
pub mod dedup;
pub mod item;
pub mod progress;

pub use batch::{BatchOperationResult, BatchRequest, PerItemResult};
pub use dedup::{DedupSummary, DuplicateGroup, MergeResult, MergedDetail};
pub use item::{Classification, ItemId, ItemUpdate, WorkItem};
pub use progress::{ProgressEvent, ProgressStatus};
