//! Merge engine: folds a validated duplicate group into its primary item.
//!
//! Steps per group: build the merged description, persist it on the
//! primary, then delete each secondary. Writes are not transactional. A
//! failed primary update leaves the group untouched (no deletes); a failed
//! secondary delete is noted and the rest continue. Running dedup again
//! converges on whatever is left.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{error, info, warn};

use crate::model::{DuplicateGroup, ItemUpdate, MergeResult, WorkItem};
use crate::store::ItemStore;
use crate::telemetry::metrics;

const HEADER_PREFIX: &str = "[Merged ";

pub struct MergeEngine {
    store: Arc<dyn ItemStore>,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Merge one group. Never fails as a whole; problems land in `failures`.
    pub async fn merge_group(&self, group: &DuplicateGroup) -> MergeResult {
        let primary = group.primary();
        let linked_record_ids = linked_records(group);
        let description = merged_description(group, linked_record_ids.len());

        let mut result = MergeResult {
            primary_item_id: primary.id.clone(),
            primary_title: primary.title.clone(),
            merged_count: 0,
            linked_record_ids,
            failures: Vec::new(),
        };

        if let Err(e) = self
            .store
            .update(&primary.id, &ItemUpdate::description(description))
            .await
        {
            error!(primary_id = %primary.id, error = %e, "failed to update primary; keeping secondaries");
            metrics::store_failures().add(1, &[KeyValue::new("operation", "update")]);
            result
                .failures
                .push(format!("update primary {}: {e}", primary.id));
            return result;
        }

        for secondary in group.secondaries() {
            match self.store.delete(&secondary.id).await {
                Ok(()) => {
                    result.merged_count += 1;
                    info!(
                        primary_id = %primary.id,
                        secondary_id = %secondary.id,
                        "merged duplicate"
                    );
                }
                Err(e) => {
                    warn!(secondary_id = %secondary.id, error = %e, "failed to delete merged duplicate");
                    metrics::store_failures().add(1, &[KeyValue::new("operation", "delete")]);
                    result
                        .failures
                        .push(format!("delete {}: {e}", secondary.id));
                }
            }
        }

        result
    }
}

/// Distinct linked records, primary first, in group order.
pub fn linked_records(group: &DuplicateGroup) -> Vec<String> {
    let mut records: Vec<String> = Vec::new();
    let candidates = group
        .members()
        .iter()
        .filter_map(|item| item.linked_record_id.as_deref())
        .map(str::trim)
        .filter(|record| !record.is_empty());
    for record in candidates {
        if !records.iter().any(|r| r == record) {
            records.push(record.to_string());
        }
    }
    records
}

/// Header line, then the primary's summary and body, then one bullet per
/// secondary summary.
pub fn merged_description(group: &DuplicateGroup, linked_record_count: usize) -> String {
    let primary = group.primary();
    let body = strip_merge_header(&primary.description);

    let mut content = match primary.non_empty_summary() {
        Some(summary) if body.is_empty() => summary.to_string(),
        Some(summary) if !body.starts_with(summary) => format!("{summary}\n\n{body}"),
        _ => body.to_string(),
    };
    for summary in group.secondaries().iter().filter_map(WorkItem::non_empty_summary) {
        content.push_str("\n- ");
        content.push_str(summary);
    }

    let header = format!(
        "{HEADER_PREFIX}{} tasks from {} linked emails]",
        group.len(),
        linked_record_count
    );
    format!("{header}\n\n{}", content.trim_start())
}

/// Drop a header written by an earlier merge so headers never stack.
fn strip_merge_header(description: &str) -> &str {
    let trimmed = description.trim();
    if !trimmed.starts_with(HEADER_PREFIX) {
        return trimmed;
    }
    match trimmed.find(']') {
        Some(end) => trimmed[end + 1..].trim_start(),
        None => trimmed,
    }
}
