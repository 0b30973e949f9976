//! Dedup service: grouping plus merging for one category, or all of them.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{Instrument, info, warn};

use super::grouper::DuplicateGrouper;
use super::merge::MergeEngine;
use crate::error::{Error, Result};
use crate::llm::GroupingService;
use crate::model::{DedupSummary, WorkItem};
use crate::store::ItemStore;
use crate::telemetry::batch::{record_dedup_totals, start_dedup_span};
use crate::telemetry::metrics;

#[derive(Clone)]
pub struct DedupService {
    store: Arc<dyn ItemStore>,
    grouper: Arc<DuplicateGrouper>,
    merger: Arc<MergeEngine>,
}

impl DedupService {
    pub fn new(store: Arc<dyn ItemStore>, grouping: Arc<dyn GroupingService>) -> Self {
        Self {
            grouper: Arc::new(DuplicateGrouper::new(grouping)),
            merger: Arc::new(MergeEngine::new(Arc::clone(&store))),
            store,
        }
    }

    /// Find and merge duplicates among the items in `category`.
    ///
    /// Grouping runs to completion before any write, so a failed or
    /// malformed grouping reply leaves the store untouched.
    pub async fn deduplicate_category(&self, category: &str) -> Result<DedupSummary> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::Validation("category must not be empty".to_string()));
        }
        let items = self.store.get_by_category(category).await?;
        self.dedup_items(category, &items).await
    }

    /// Deduplicate every category in the store.
    ///
    /// A grouping failure in one category is reported in that category's
    /// summary; store failures abort the whole call.
    pub async fn deduplicate_all(&self) -> Result<Vec<DedupSummary>> {
        let categories = self.store.categories().await?;
        let mut summaries = Vec::with_capacity(categories.len());

        for category in categories {
            let items = self.store.get_by_category(&category).await?;
            match self.dedup_items(&category, &items).await {
                Ok(summary) => summaries.push(summary),
                Err(e) if e.is_upstream_ai() => {
                    warn!(category = %category, error = %e, "skipping category after grouping failure");
                    let mut summary = DedupSummary::empty(&category, items.len());
                    summary.failures.push(e.to_string());
                    summaries.push(summary);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summaries)
    }

    async fn dedup_items(&self, category: &str, items: &[WorkItem]) -> Result<DedupSummary> {
        let span = start_dedup_span(category);
        let summary = async {
            let groups = self.grouper.find_groups(category, items).await?;

            let mut summary = DedupSummary::empty(category, items.len());
            summary.duplicate_groups = groups.len();
            for group in &groups {
                let merged = self.merger.merge_group(group).await;
                summary.tasks_merged += merged.merged_count;
                summary.failures.extend(merged.failures.iter().cloned());
                summary.merged_details.push(merged.detail());
            }

            info!(
                tasks_checked = summary.tasks_checked,
                duplicate_groups = summary.duplicate_groups,
                tasks_merged = summary.tasks_merged,
                "dedup complete"
            );
            Ok::<_, Error>(summary)
        }
        .instrument(span.clone())
        .await?;

        record_dedup_totals(&span, summary.duplicate_groups, summary.tasks_merged);
        let labels = [KeyValue::new("category", category.to_string())];
        metrics::dedup_groups().add(summary.duplicate_groups as u64, &labels);
        metrics::items_merged().add(summary.tasks_merged as u64, &labels);
        Ok(summary)
    }
}
