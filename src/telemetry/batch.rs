//! Span helpers for batch runs and dedup calls.

use tracing::Span;
use uuid::Uuid;

/// Start a span covering one coordinator invocation.
///
/// `batch.outcome` is declared empty and filled by [`record_batch_outcome`].
pub fn start_batch_span(operation: &str, batch_id: &Uuid, total: usize) -> Span {
    tracing::info_span!(
        "batch.run",
        "batch.operation" = operation,
        "batch.id" = %batch_id,
        "batch.total" = total,
        "batch.outcome" = tracing::field::Empty,
    )
}

/// Record how a batch ended ("completed" or "cancelled").
pub fn record_batch_outcome(span: &Span, outcome: &str) {
    span.record("batch.outcome", outcome);
}

/// Start a span covering one dedup call over a category.
pub fn start_dedup_span(category: &str) -> Span {
    tracing::info_span!(
        "dedup.category",
        "dedup.category" = category,
        "dedup.groups" = tracing::field::Empty,
        "dedup.merged" = tracing::field::Empty,
    )
}

/// Record dedup totals on a span from [`start_dedup_span`].
pub fn record_dedup_totals(span: &Span, groups: usize, merged: usize) {
    span.record("dedup.groups", groups);
    span.record("dedup.merged", merged);
}
