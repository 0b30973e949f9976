//! Duplicate grouper: asks the grouping model which same-category items are
//! duplicates and turns the reply into validated [`DuplicateGroup`]s.
//!
//! The reply is untrusted. It must parse completely or the whole call fails.
//! Unknown IDs are dropped, an item belongs to the first valid group that
//! names it, and groups left with fewer than two members are discarded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::llm::response;
use crate::llm::{GroupingRequest, GroupingService};
use crate::model::{DuplicateGroup, WorkItem};

/// The JSON object the grouping model is asked to produce.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupingResponse {
    /// IDs as returned. Numbers are accepted for numeric IDs.
    pub duplicate_groups: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub reasoning: String,
}

impl GroupingResponse {
    pub fn parse(raw: &str) -> Result<Self> {
        response::parse_json(raw)
    }
}

pub struct DuplicateGrouper {
    service: Arc<dyn GroupingService>,
}

impl DuplicateGrouper {
    pub fn new(service: Arc<dyn GroupingService>) -> Self {
        Self { service }
    }

    /// Find duplicate groups among `items`, which must share `category`.
    ///
    /// Fewer than two items never reach the model.
    ///
    /// # Errors
    ///
    /// `GroupingService` if the call fails, `MalformedResponse` if the reply
    /// is not the expected JSON object.
    pub async fn find_groups(&self, category: &str, items: &[WorkItem]) -> Result<Vec<DuplicateGroup>> {
        if items.len() < 2 {
            debug!(category, items = items.len(), "too few items to group");
            return Ok(Vec::new());
        }

        let request = GroupingRequest {
            category: category.to_string(),
            prompt: build_prompt(category, items),
        };
        let raw = self
            .service
            .find_duplicate_groups(&request)
            .await
            .map_err(|e| match e {
                Error::GroupingService(_) => e,
                other => Error::GroupingService(other.to_string()),
            })?;

        let response = GroupingResponse::parse(&raw)?;
        let groups = validate_groups(&response, items);
        info!(
            category,
            items = items.len(),
            proposed = response.duplicate_groups.len(),
            accepted = groups.len(),
            reasoning = %response.reasoning,
            "duplicate grouping complete"
        );
        Ok(groups)
    }
}

/// Build the grouping prompt: instructions plus one `Item <id>: <content>` line per item.
pub fn build_prompt(category: &str, items: &[WorkItem]) -> String {
    let listing = items
        .iter()
        .map(|item| {
            let content = item.display_content().replace(['\n', '\r'], " ");
            format!("Item {}: {}", item.id, content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "These tasks are all in the \"{category}\" category.\n\
         Find groups of tasks that are about the same underlying topic or request, \
         even when they are worded differently.\n\n\
         {listing}\n\n\
         Rules:\n\
         - Only group tasks that are genuinely the same thing.\n\
         - Each task may appear in at most one group.\n\
         - List the task that best represents its group first.\n\
         - Use the exact IDs shown above.\n\n\
         Respond with only this JSON object:\n\
         {{\"duplicate_groups\": [[\"<id>\", \"<id>\"]], \"reasoning\": \"<short explanation>\"}}\n\
         Use an empty list when there are no duplicates."
    )
}

/// Resolve a parsed reply against the known items.
pub fn validate_groups(response: &GroupingResponse, items: &[WorkItem]) -> Vec<DuplicateGroup> {
    let known: HashMap<&str, &WorkItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    for (index, proposed) in response.duplicate_groups.iter().enumerate() {
        let mut members: Vec<WorkItem> = Vec::with_capacity(proposed.len());
        for raw_id in proposed {
            let Some(id) = id_text(raw_id) else {
                warn!(group = index, value = %raw_id, "ignoring non-ID value in group");
                continue;
            };
            let Some(item) = known.get(id.as_str()) else {
                warn!(group = index, item_id = %id, "ignoring unknown item ID");
                continue;
            };
            if claimed.contains(&id) {
                warn!(group = index, item_id = %id, "item already in an earlier group");
                continue;
            }
            members.push((*item).clone());
        }

        match DuplicateGroup::new(members) {
            Some(group) => {
                claimed.extend(group.ids().into_iter().map(|id| id.to_string()));
                groups.push(group);
            }
            None => debug!(group = index, "discarding group with fewer than two known items"),
        }
    }
    groups
}

fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<WorkItem> {
        vec![
            WorkItem::new("t1", "Reply to Dana", "action").summary("Reply to Dana about\nthe offsite"),
            WorkItem::new("t2", "Offsite follow-up", "action"),
            WorkItem::new("t3", "Renew passport", "action"),
        ]
    }

    fn response(groups: serde_json::Value) -> GroupingResponse {
        serde_json::from_value(json!({"duplicate_groups": groups, "reasoning": "x"})).unwrap()
    }

    fn ids(group: &DuplicateGroup) -> Vec<&str> {
        group.members().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn prompt_lists_one_line_per_item() {
        let prompt = build_prompt("action", &items());
        assert!(prompt.contains("Item t1: Reply to Dana about the offsite\n"));
        assert!(prompt.contains("Item t2: Offsite follow-up\n"));
        assert!(prompt.contains("Item t3: Renew passport\n"));
        assert!(prompt.contains("\"duplicate_groups\""));
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let groups = validate_groups(&response(json!([["t1", "t2", "ghost"]])), &items());
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["t1", "t2"]);
    }

    #[test]
    fn groups_below_two_known_are_discarded() {
        let groups = validate_groups(&response(json!([["t1", "ghost"], ["t3"]])), &items());
        assert!(groups.is_empty());
    }

    #[test]
    fn first_group_wins_on_overlap() {
        let groups = validate_groups(&response(json!([["t1", "t2"], ["t2", "t3"]])), &items());
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["t1", "t2"]);
    }

    #[test]
    fn discarded_group_does_not_claim_items() {
        let groups = validate_groups(&response(json!([["t1", "nope"], ["t1", "t3"]])), &items());
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["t1", "t3"]);
    }

    #[test]
    fn numeric_ids_resolve() {
        let items = vec![WorkItem::new("1", "a", "fyi"), WorkItem::new("2", "b", "fyi")];
        let groups = validate_groups(&response(json!([[1, 2]])), &items);
        assert_eq!(groups.len(), 1);
    }
}
