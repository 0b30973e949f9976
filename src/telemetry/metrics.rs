//! Metric instrument factories for triage-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"triage-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("triage-rs")
}

/// Counter: items processed by the batch coordinator.
/// Labels: `operation`, `result` ("ok" | "error").
pub fn batch_items() -> Counter<u64> {
    meter()
        .u64_counter("triage.batch.items")
        .with_description("Items processed by batch runs")
        .build()
}

/// Counter: batches stopped because the progress consumer disconnected.
/// Labels: `operation`.
pub fn batch_cancelled() -> Counter<u64> {
    meter()
        .u64_counter("triage.batch.cancelled")
        .with_description("Batch runs cancelled by consumer disconnect")
        .build()
}

/// Counter: validated duplicate groups found.
/// Labels: `category`.
pub fn dedup_groups() -> Counter<u64> {
    meter()
        .u64_counter("triage.dedup.groups")
        .with_description("Duplicate groups found")
        .build()
}

/// Counter: secondaries confirmed deleted by merges.
/// Labels: `category`.
pub fn items_merged() -> Counter<u64> {
    meter()
        .u64_counter("triage.dedup.items_merged")
        .with_description("Items merged into a primary and deleted")
        .build()
}

/// Counter: store writes that failed during a merge.
/// Labels: `operation` ("update" | "delete").
pub fn store_failures() -> Counter<u64> {
    meter()
        .u64_counter("triage.store.failures")
        .with_description("Failed item store writes")
        .build()
}

/// Counter: model calls.
/// Labels: `purpose`, `result`.
pub fn llm_calls() -> Counter<u64> {
    meter()
        .u64_counter("triage.llm.calls")
        .with_description("Model calls")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("triage.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
