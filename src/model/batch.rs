//! Batch requests and their aggregated results.

use serde::{Deserialize, Serialize};

use super::item::ItemId;
use crate::error::{Error, Result};

/// A caller-specified ordered set of item IDs plus an optional shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    /// Free-form context applied uniformly to every item (e.g. "I'm on vacation").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl BatchRequest {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            item_ids: ids.into_iter().map(|s| ItemId::from(s.into())).collect(),
            context: None,
        }
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Reject structurally invalid requests before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.item_ids.is_empty() {
            return Err(Error::Validation("item_ids must not be empty".to_string()));
        }
        if let Some(pos) = self.item_ids.iter().position(|id| id.0.trim().is_empty()) {
            return Err(Error::Validation(format!("item_ids[{pos}] is blank")));
        }
        Ok(())
    }

    /// The shared context, ignoring blank strings.
    pub fn shared_context(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Outcome for one item in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerItemResult {
    pub item_id: ItemId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerItemResult {
    pub fn ok(item_id: ItemId, data: serde_json::Value) -> Self {
        Self {
            item_id,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(item_id: ItemId, error: impl Into<String>) -> Self {
        Self {
            item_id,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate of a batch run. `total == successful + failed` and `results`
/// is in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperationResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<PerItemResult>,
}

impl BatchOperationResult {
    pub fn from_results(results: Vec<PerItemResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_request_is_rejected() {
        let err = BatchRequest::new(Vec::<String>::new()).validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_id_is_rejected() {
        let err = BatchRequest::new(["e1", "  "]).validate().unwrap_err();
        assert!(err.to_string().contains("item_ids[1]"));
    }

    #[test]
    fn counts_add_up() {
        let result = BatchOperationResult::from_results(vec![
            PerItemResult::ok("a".into(), json!({})),
            PerItemResult::failed("b".into(), "boom"),
            PerItemResult::ok("c".into(), json!({})),
        ]);
        assert_eq!(result.total, 3);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn failure_serializes_without_data() {
        let value = serde_json::to_value(PerItemResult::failed("e9".into(), "nope")).unwrap();
        assert_eq!(value, json!({"item_id": "e9", "success": false, "error": "nope"}));
    }
}
