//! Postgres connection pool and schema.
//!
//! [`Db`] is the production [`ItemStore`](crate::store::ItemStore); the
//! queries live in [`items`].

pub mod items;

use std::time::Duration;

use crate::error::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await?;
        info!(max_connections = MAX_CONNECTIONS, "connected to item store");
        Ok(Self { pool })
    }

    /// Apply the embedded `migrations/` directory.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("item store migration failed: {e}")))
    }

    /// Fails unless the pool answers and the `work_items` table exists.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1 FROM work_items LIMIT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
