//! Email classification as a batch operation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::batch::ItemOperation;
use crate::error::{Error, Result};
use crate::llm::Classifier;
use crate::model::{ItemId, ItemUpdate};
use crate::store::ItemStore;

/// Looks an item up, classifies it, and stores the category and summary.
pub struct ClassifyOperation {
    store: Arc<dyn ItemStore>,
    classifier: Arc<dyn Classifier>,
}

impl ClassifyOperation {
    pub fn new(store: Arc<dyn ItemStore>, classifier: Arc<dyn Classifier>) -> Self {
        Self { store, classifier }
    }
}

#[async_trait]
impl ItemOperation for ClassifyOperation {
    fn name(&self) -> &str {
        "classify"
    }

    async fn apply(&self, id: &ItemId, context: Option<&str>) -> Result<serde_json::Value> {
        let item = self.store.get(id).await?;

        let classification = self
            .classifier
            .classify(&item.classification_content(), context)
            .await
            .map_err(|e| match e {
                Error::Classifier(_) => e,
                other => Error::Classifier(other.to_string()),
            })?;

        let update = ItemUpdate {
            category: Some(classification.category.clone()),
            summary: classification.summary.clone(),
            description: None,
        };
        self.store.update(id, &update).await.map_err(|e| match e {
            Error::Persistence(_) | Error::NotFound(_) => e,
            other => Error::Persistence(other.to_string()),
        })?;

        debug!(item_id = %id, category = %classification.category, "item classified");
        serde_json::to_value(&classification)
            .map_err(|e| Error::Other(format!("serialize classification: {e}")))
    }
}
