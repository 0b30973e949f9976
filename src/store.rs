//! Item store capability.
//!
//! The engine only sees [`ItemStore`]. Postgres backs it in production
//! (`crate::db::Db`); [`MemoryStore`] backs tests and local runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{ItemId, ItemUpdate, WorkItem};

/// Lookup, update and delete of work items. Implementations must be safe
/// under concurrent batches.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch one item. `NotFound` when absent.
    async fn get(&self, id: &ItemId) -> Result<WorkItem>;

    /// All items in a category, oldest first.
    async fn get_by_category(&self, category: &str) -> Result<Vec<WorkItem>>;

    /// Distinct categories that currently hold items.
    async fn categories(&self) -> Result<Vec<String>>;

    /// Apply a partial update. `NotFound` when absent.
    async fn update(&self, id: &ItemId, update: &ItemUpdate) -> Result<()>;

    /// Delete an item. `NotFound` when absent.
    async fn delete(&self, id: &ItemId) -> Result<()>;
}

/// Insertion-ordered in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<WorkItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
        }
    }

    /// Insert or replace an item, keeping its original position on replace.
    pub async fn insert(&self, item: WorkItem) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub async fn contains(&self, id: &ItemId) -> bool {
        self.items.read().await.iter().any(|i| &i.id == id)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<WorkItem> {
        self.items.read().await.clone()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, id: &ItemId) -> Result<WorkItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|i| &i.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect())
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let items = self.items.read().await;
        let mut categories: Vec<String> = Vec::new();
        for item in items.iter() {
            if !categories.contains(&item.category) {
                categories.push(item.category.clone());
            }
        }
        Ok(categories)
    }

    async fn update(&self, id: &ItemId, update: &ItemUpdate) -> Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        update.apply_to(item);
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<()> {
        let mut items = self.items.write().await;
        let pos = items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        items.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_items([
            WorkItem::new("t1", "Pay invoice", "action"),
            WorkItem::new("t2", "Lunch menu", "fyi"),
            WorkItem::new("t3", "Invoice overdue", "action"),
        ])
    }

    #[tokio::test]
    async fn category_lookup_keeps_insertion_order() {
        let items = store().get_by_category("action").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = store();
        store.delete(&"t2".into()).await.unwrap();
        let err = store.delete(&"t2".into()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn categories_are_distinct() {
        assert_eq!(store().categories().await.unwrap(), vec!["action", "fyi"]);
    }
}
