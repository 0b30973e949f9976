//! Work item persistence: the Postgres implementation of `ItemStore`.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{ItemId, ItemUpdate, WorkItem};
use crate::store::ItemStore;

const SELECT_COLUMNS: &str =
    "SELECT id, title, summary, description, category, linked_record_id, created_at FROM work_items";

impl super::Db {
    /// Insert or replace an item. Used by importers and tests.
    pub async fn upsert_item(&self, item: &WorkItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO work_items (id, title, summary, description, category, linked_record_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now())
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                linked_record_id = EXCLUDED.linked_record_id,
                updated_at = now()",
        )
        .bind(item.id.as_str())
        .bind(&item.title)
        .bind(&item.summary)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.linked_record_id)
        .bind(item.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// List items, optionally filtered by category, oldest first.
    pub async fn list_items(&self, category: Option<&str>, limit: i64) -> Result<Vec<WorkItem>> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS}
             WHERE ($1::text IS NULL OR category = $1)
             ORDER BY created_at, id
             LIMIT $2"
        ))
        .bind(category)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(WorkItem::from).collect())
    }
}

#[async_trait]
impl ItemStore for super::Db {
    async fn get(&self, id: &ItemId) -> Result<WorkItem> {
        let row: Option<WorkItemRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.map(WorkItem::from)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<WorkItem>> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE category = $1 ORDER BY created_at, id"
        ))
        .bind(category)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(WorkItem::from).collect())
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT category FROM work_items GROUP BY category ORDER BY MIN(created_at), category",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    async fn update(&self, id: &ItemId, update: &ItemUpdate) -> Result<()> {
        if update.is_empty() {
            // Still report a missing item.
            return self.get(id).await.map(|_| ());
        }

        let rows_affected = sqlx::query(
            "UPDATE work_items SET
                category = COALESCE($1, category),
                summary = COALESCE($2, summary),
                description = COALESCE($3, description),
                updated_at = now()
             WHERE id = $4",
        )
        .bind(&update.category)
        .bind(&update.summary)
        .bind(&update.description)
        .bind(id.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| Error::Persistence(format!("update {id}: {e}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM work_items WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| Error::Persistence(format!("delete {id}: {e}")))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct WorkItemRow {
    id: String,
    title: String,
    summary: Option<String>,
    description: String,
    category: String,
    linked_record_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<WorkItemRow> for WorkItem {
    fn from(row: WorkItemRow) -> Self {
        Self {
            id: ItemId(row.id),
            title: row.title,
            summary: row.summary,
            description: row.description,
            category: row.category,
            linked_record_id: row.linked_record_id,
            created_at: row.created_at,
        }
    }
}
