//! Progress events emitted while a batch runs.
//!
//! The sequence for a batch of N items is one start event (`current = 0`),
//! then a `processing` event and a terminal `completed`/`error` event per
//! item, then one final `completed` event with `current == total`.

use serde::{Deserialize, Serialize};

use super::item::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProgressStatus::Processing => "processing",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One step of a batch, self-describing so a streaming consumer needs no
/// other state to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based index of the item this event is about; 0 for the start event.
    pub current: usize,
    pub total: usize,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    pub message: String,
    /// Present iff `status == Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-item outcome on `completed`; the batch aggregate on the final event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub progress_percent: f64,
}

impl ProgressEvent {
    fn new(current: usize, total: usize, status: ProgressStatus, message: String) -> Self {
        Self {
            current,
            total,
            status,
            item_id: None,
            message,
            error: None,
            data: None,
            progress_percent: percent(current, total),
        }
    }

    pub fn started(total: usize) -> Self {
        Self::new(
            0,
            total,
            ProgressStatus::Processing,
            format!("Starting batch of {total} items"),
        )
    }

    pub fn processing(current: usize, total: usize, item_id: &ItemId) -> Self {
        Self {
            item_id: Some(item_id.clone()),
            ..Self::new(
                current,
                total,
                ProgressStatus::Processing,
                format!("Processing item {current} of {total}"),
            )
        }
    }

    pub fn item_completed(
        current: usize,
        total: usize,
        item_id: &ItemId,
        data: serde_json::Value,
    ) -> Self {
        Self {
            item_id: Some(item_id.clone()),
            data: Some(data),
            ..Self::new(
                current,
                total,
                ProgressStatus::Completed,
                format!("Completed item {current} of {total}"),
            )
        }
    }

    pub fn item_failed(current: usize, total: usize, item_id: &ItemId, error: String) -> Self {
        Self {
            item_id: Some(item_id.clone()),
            error: Some(error),
            ..Self::new(
                current,
                total,
                ProgressStatus::Error,
                format!("Failed item {current} of {total}"),
            )
        }
    }

    pub fn finished(total: usize, successful: usize, failed: usize, data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(
                total,
                total,
                ProgressStatus::Completed,
                format!("Batch complete: {successful} succeeded, {failed} failed"),
            )
        }
    }

    /// The final aggregate event is the only completed event without an item.
    pub fn is_final(&self) -> bool {
        self.status == ProgressStatus::Completed && self.item_id.is_none()
    }
}

fn percent(current: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        current as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_tracks_current() {
        let id = ItemId::from("e1");
        assert_eq!(ProgressEvent::started(4).progress_percent, 0.0);
        assert_eq!(ProgressEvent::processing(1, 4, &id).progress_percent, 25.0);
        assert_eq!(
            ProgressEvent::finished(4, 4, 0, serde_json::Value::Null).progress_percent,
            100.0
        );
    }

    #[test]
    fn error_field_only_on_error_status() {
        let id = ItemId::from("e1");
        let failed = ProgressEvent::item_failed(1, 1, &id, "lookup failed".to_string());
        assert_eq!(failed.status, ProgressStatus::Error);
        assert!(failed.error.is_some());

        let done = ProgressEvent::item_completed(1, 1, &id, serde_json::json!({}));
        assert!(done.error.is_none());
        assert!(!done.is_final());
    }
}
