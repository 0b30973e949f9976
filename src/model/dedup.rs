//! Duplicate groups and merge outcomes.

use serde::{Deserialize, Serialize};

use super::item::{ItemId, WorkItem};

/// Two or more distinct, store-resolved items judged to be the same task.
///
/// The first member is the primary (kept); the rest are secondaries
/// (merged into the primary, then deleted).
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    members: Vec<WorkItem>,
}

impl DuplicateGroup {
    /// Build a group, dropping repeated IDs. Returns `None` when fewer than
    /// two distinct members remain.
    pub fn new(members: Vec<WorkItem>) -> Option<Self> {
        let mut distinct: Vec<WorkItem> = Vec::with_capacity(members.len());
        for item in members {
            if !distinct.iter().any(|m| m.id == item.id) {
                distinct.push(item);
            }
        }
        (distinct.len() >= 2).then_some(Self { members: distinct })
    }

    pub fn primary(&self) -> &WorkItem {
        &self.members[0]
    }

    pub fn secondaries(&self) -> &[WorkItem] {
        &self.members[1..]
    }

    pub fn members(&self) -> &[WorkItem] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a group has at least two members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> Vec<&ItemId> {
        self.members.iter().map(|m| &m.id).collect()
    }
}

/// Effect of merging one group. Not persisted; the changes land on the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub primary_item_id: ItemId,
    pub primary_title: String,
    /// Secondaries confirmed deleted.
    pub merged_count: usize,
    /// Distinct linked source records across the whole group, primary first.
    pub linked_record_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl MergeResult {
    pub fn detail(&self) -> MergedDetail {
        MergedDetail {
            primary_id: self.primary_item_id.clone(),
            primary_title: self.primary_title.clone(),
            merged_count: self.merged_count,
            linked_record_count: self.linked_record_ids.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDetail {
    pub primary_id: ItemId,
    pub primary_title: String,
    pub merged_count: usize,
    pub linked_record_count: usize,
}

/// Output of one dedup call over a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupSummary {
    pub category: String,
    pub tasks_checked: usize,
    pub duplicate_groups: usize,
    pub tasks_merged: usize,
    pub merged_details: Vec<MergedDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl DedupSummary {
    pub fn empty(category: impl Into<String>, tasks_checked: usize) -> Self {
        Self {
            category: category.into(),
            tasks_checked,
            duplicate_groups: 0,
            tasks_merged: 0,
            merged_details: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_needs_two_distinct_members() {
        let a = WorkItem::new("a", "A", "fyi");
        assert!(DuplicateGroup::new(vec![a.clone(), a.clone()]).is_none());

        let b = WorkItem::new("b", "B", "fyi");
        let group = DuplicateGroup::new(vec![a.clone(), b, a]).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.primary().id.as_str(), "a");
        assert_eq!(group.secondaries()[0].id.as_str(), "b");
    }
}
