//! Work items and classification outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// An email or a task derived from one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier. Opaque to the engine.
    pub id: ItemId,

    /// Raw title (email subject or task title).
    pub title: String,

    /// One-line AI-generated summary. Preferred over `title` wherever the
    /// item is shown to the grouping model.
    pub summary: Option<String>,

    /// Free-form body. Rewritten when duplicates are merged into this item.
    pub description: String,

    /// Triage category (e.g. "fyi", "action").
    pub category: String,

    /// Source email this item was derived from, if any.
    pub linked_record_id: Option<String>,

    /// Creation time. Stores return items in creation order, which is the
    /// tie-break for primary selection.
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: ItemId::from(id.into()),
            title: title.into(),
            summary: None,
            description: String::new(),
            category: category.into(),
            linked_record_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn linked_record(mut self, record_id: impl Into<String>) -> Self {
        self.linked_record_id = Some(record_id.into());
        self
    }

    /// The one-line summary if it has any content.
    pub fn non_empty_summary(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Text fed to the grouping model: the summary when present, else the title.
    pub fn display_content(&self) -> &str {
        self.non_empty_summary().unwrap_or(&self.title)
    }

    /// Text fed to the classifier.
    pub fn classification_content(&self) -> String {
        format!("Subject: {}\n\n{}", self.title, self.description)
    }
}

/// Newtype for item IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Partial update applied through `ItemStore::update`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub category: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl ItemUpdate {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.summary.is_none() && self.description.is_none()
    }

    /// Apply to an in-memory item.
    pub fn apply_to(&self, item: &mut WorkItem) {
        if let Some(ref category) = self.category {
            item.category = category.clone();
        }
        if let Some(ref summary) = self.summary {
            item.summary = Some(summary.clone());
        }
        if let Some(ref description) = self.description {
            item.description = description.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What the classifier decided about one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Classification {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            confidence: None,
            summary: None,
            reasoning: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_content_prefers_summary() {
        let item = WorkItem::new("t1", "Re: Fwd: quarterly numbers", "action")
            .summary("Send Q3 numbers to finance");
        assert_eq!(item.display_content(), "Send Q3 numbers to finance");
    }

    #[test]
    fn blank_summary_falls_back_to_title() {
        let item = WorkItem::new("t1", "Quarterly numbers", "action").summary("   ");
        assert_eq!(item.display_content(), "Quarterly numbers");
        assert!(item.non_empty_summary().is_none());
    }

    #[test]
    fn update_only_touches_set_fields() {
        let mut item = WorkItem::new("t1", "Title", "fyi").description("old");
        ItemUpdate::description("new").apply_to(&mut item);
        assert_eq!(item.description, "new");
        assert_eq!(item.category, "fyi");
        assert!(item.summary.is_none());
    }
}
