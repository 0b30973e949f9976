//! Batch orchestration and AI-assisted duplicate merging.

pub mod batch;
pub mod classify;
pub mod dedup;
pub mod grouper;
pub mod merge;

pub use batch::{BatchCoordinator, BatchOutcome, BatchPhase, ItemOperation};
pub use classify::ClassifyOperation;
pub use dedup::DedupService;
pub use grouper::{DuplicateGrouper, GroupingResponse};
pub use merge::MergeEngine;
