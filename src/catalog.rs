//! YAML catalog import: connections, partition values and fetch jobs linked
//! by name.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use sqlx::SqliteConnection;
use std::path::Path;
use tracing::{info, instrument};

use crate::db::{self, Pool};
use crate::model::{
    Audit, Database, DefaultFetchConfig, Fetch, FileDir, PartitionKey, PartitionValue,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub databases: Vec<DatabaseEntry>,
    pub file_dirs: Vec<FileDirEntry>,
    pub partition_values: Vec<PartitionValueEntry>,
    pub partition_keys: Vec<PartitionKeyEntry>,
    pub default_configs: Vec<DefaultConfigEntry>,
    pub fetches: Vec<FetchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseEntry {
    pub name: String,
    pub verbose_name: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDirEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionValueEntry {
    pub name: String,
    pub format_date: String,
    pub forward_days: Option<i64>,
    pub slice_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionKeyEntry {
    pub field: String,
    /// Name of a partition value.
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultConfigEntry {
    pub name: String,
    pub fields_terminated_by: Option<String>,
    pub null_string: Option<String>,
    pub null_non_string: Option<String>,
    pub hive_delims_replacement: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchEntry {
    pub fetch_name: String,
    pub database: String,
    pub source_table: Option<String>,
    pub query: Option<String>,
    pub split_by: Option<String>,
    pub delete_target_dir: Option<String>,
    pub target_dir: Option<String>,
    pub hive_database: Option<String>,
    pub hive_table: Option<String>,
    /// Field of a partition key; exactly one key may have it.
    pub partition_key: Option<String>,
    #[serde(default)]
    pub hive_overwrite: bool,
    #[serde(default)]
    pub direct: bool,
    pub m: Option<i64>,
    pub outdir: Option<String>,
    pub extra_config: Option<String>,
    pub file_dir: Option<String>,
    pub default_config: Option<String>,
}

/// Row counts written by [`import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub databases: usize,
    pub file_dirs: usize,
    pub partition_values: usize,
    pub partition_keys: usize,
    pub default_configs: usize,
    pub fetches: usize,
}

pub fn parse(content: &str) -> Result<Catalog> {
    serde_yaml::from_str(content).context("invalid catalog YAML")
}

pub fn load(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    parse(&content)
}

fn require(kind: &str, name: &str, id: Option<i64>) -> Result<i64> {
    id.ok_or_else(|| anyhow!("{kind} '{name}' not found"))
}

/// Inserts every entry in one transaction, so a failing entry leaves the
/// database as it was. References may point at rows from this catalog or
/// rows already in the database.
#[instrument(skip_all)]
pub async fn import(pool: &Pool, catalog: &Catalog, author: Option<&str>) -> Result<ImportReport> {
    let mut tx = pool.begin().await?;
    match insert_all(&mut tx, catalog, author).await {
        Ok(report) => {
            tx.commit().await?;
            info!(?report, "catalog imported");
            Ok(report)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err)
        }
    }
}

async fn insert_all(
    conn: &mut SqliteConnection,
    catalog: &Catalog,
    author: Option<&str>,
) -> Result<ImportReport> {
    let audit = Audit {
        created_by: author.map(str::to_owned),
        changed_by: author.map(str::to_owned),
        ..Default::default()
    };
    let mut report = ImportReport::default();

    for entry in &catalog.partition_values {
        let value = PartitionValue {
            name: entry.name.clone(),
            format_date: entry.format_date.clone(),
            forward_days: entry.forward_days,
            slice_format: entry.slice_format.clone(),
            audit: audit.clone(),
            ..Default::default()
        };
        // Reject values that could never render before they reach a script.
        value
            .real_value(chrono::Local::now().date_naive())
            .with_context(|| format!("partition value '{}'", entry.name))?;
        db::insert_partition_value(&mut *conn, &value).await?;
        report.partition_values += 1;
    }

    for entry in &catalog.partition_keys {
        let default_value_id = match entry.default_value.as_deref() {
            Some(name) => Some(require(
                "partition value",
                name,
                db::partition_value_id(&mut *conn, name).await?,
            )?),
            None => None,
        };
        let key = PartitionKey {
            field: entry.field.clone(),
            default_value_id,
            audit: audit.clone(),
            ..Default::default()
        };
        db::insert_partition_key(&mut *conn, &key).await?;
        report.partition_keys += 1;
    }

    for entry in &catalog.file_dirs {
        let dir = FileDir {
            name: entry.name.clone(),
            path: entry.path.clone(),
            audit: audit.clone(),
            ..Default::default()
        };
        db::insert_file_dir(&mut *conn, &dir).await?;
        report.file_dirs += 1;
    }

    for entry in &catalog.default_configs {
        let cfg = DefaultFetchConfig {
            name: entry.name.clone(),
            fields_terminated_by: entry.fields_terminated_by.clone(),
            null_string: entry.null_string.clone(),
            null_non_string: entry.null_non_string.clone(),
            hive_delims_replacement: entry.hive_delims_replacement.clone(),
            audit: audit.clone(),
            ..Default::default()
        };
        db::insert_default_config(&mut *conn, &cfg).await?;
        report.default_configs += 1;
    }

    for entry in &catalog.databases {
        let mut database = Database {
            database_name: entry.name.clone(),
            verbose_name: entry.verbose_name.clone(),
            audit: audit.clone(),
            ..Default::default()
        };
        database
            .set_uri(&entry.uri)
            .with_context(|| format!("database '{}'", entry.name))?;
        db::insert_database(&mut *conn, &database).await?;
        report.databases += 1;
    }

    for entry in &catalog.fetches {
        let database_id = require(
            "database",
            &entry.database,
            db::database_id(&mut *conn, &entry.database).await?,
        )?;

        let partition_key_id = match entry.partition_key.as_deref() {
            Some(f) => Some(require(
                "partition key",
                f,
                db::partition_key_id(&mut *conn, f)
                    .await
                    .with_context(|| format!("fetch '{}'", entry.fetch_name))?,
            )?),
            None => None,
        };
        let file_dir_id = match entry.file_dir.as_deref() {
            Some(n) => Some(require("file dir", n, db::file_dir_id(&mut *conn, n).await?)?),
            None => None,
        };
        let default_config_id = match entry.default_config.as_deref() {
            Some(n) => Some(require(
                "default config",
                n,
                db::default_config_id(&mut *conn, n).await?,
            )?),
            None => None,
        };

        let fetch = Fetch {
            fetch_name: entry.fetch_name.clone(),
            database_id,
            source_table: entry.source_table.clone(),
            query: entry.query.clone(),
            split_by: entry.split_by.clone(),
            delete_target_dir: entry.delete_target_dir.clone(),
            target_dir: entry.target_dir.clone(),
            hive_database: entry.hive_database.clone(),
            hive_table: entry.hive_table.clone(),
            partition_key_id,
            hive_overwrite: entry.hive_overwrite,
            direct: entry.direct,
            m: entry.m,
            outdir: entry.outdir.clone(),
            extra_config: entry.extra_config.clone(),
            file_dir_id,
            default_config_id,
            audit: audit.clone(),
            ..Default::default()
        };
        db::insert_fetch(&mut *conn, &fetch).await?;
        report.fetches += 1;
    }

    Ok(report)
}
