//! Aggregates and view models returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Script
//! assembly lives in `crate::compose`.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{Database, DefaultFetchConfig, Fetch, FileDir, PartitionKey, PartitionValue};

/// A Fetch together with every row it references.
#[derive(Debug, Clone, Serialize)]
pub struct FetchBundle {
    pub fetch: Fetch,
    pub database: Database,
    pub file_dir: Option<FileDir>,
    pub partition_key: Option<PartitionKey>,
    /// The partition key's default value, when it has one.
    pub partition_value: Option<PartitionValue>,
    pub default_config: Option<DefaultFetchConfig>,
}

/// One line of `union list`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub fetch_name: String,
    pub database_name: String,
    pub hive_table: Option<String>,
    pub created_by: Option<String>,
    pub changed_on: Option<NaiveDateTime>,
}
