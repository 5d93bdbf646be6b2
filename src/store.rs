use anyhow::Result;
use async_trait::async_trait;

use crate::db::{self, FetchBundle, Pool};
use crate::model::PartitionValue;

/// Read access to the catalog, handed explicitly to the script composer.
#[async_trait]
pub trait FetchStore: Send + Sync {
    async fn fetch_bundle(&self, fetch_name: &str) -> Result<Option<FetchBundle>>;

    async fn partition_value(&self, name: &str) -> Result<Option<PartitionValue>>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl FetchStore for SqliteStore {
    async fn fetch_bundle(&self, fetch_name: &str) -> Result<Option<FetchBundle>> {
        db::get_fetch_bundle(&self.pool, fetch_name).await
    }

    async fn partition_value(&self, name: &str) -> Result<Option<PartitionValue>> {
        db::get_partition_value(&self.pool, name).await
    }
}
