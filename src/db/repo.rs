use super::model::{FetchBundle, FetchSummary};
use crate::model::{
    Audit, Database, DefaultFetchConfig, Fetch, FileDir, PartitionKey, PartitionValue,
};
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // Foreign keys on for every pooled connection
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("failed to open catalog at {normalized}"))?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/`, make sure the parent
/// directory exists and that the file gets created on first open.
fn prepare_sqlite_url(url: &str) -> String {
    // Pass through non-sqlite schemes
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    // In-memory catalogs (tests) have nothing to prepare
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    // Strip optional // and split off the query string
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    // Expand leading ~/ to HOME
    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    // Best effort; connect reports the real error if this fails
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Create the file on first open unless the caller chose a mode
    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}?mode=rwc"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn audit_from_row(row: &SqliteRow) -> Audit {
    Audit {
        created_on: row
            .try_get::<Option<NaiveDateTime>, _>("created_on")
            .ok()
            .flatten(),
        changed_on: row
            .try_get::<Option<NaiveDateTime>, _>("changed_on")
            .ok()
            .flatten(),
        created_by: row.try_get::<Option<String>, _>("created_by").ok().flatten(),
        changed_by: row.try_get::<Option<String>, _>("changed_by").ok().flatten(),
    }
}

fn database_from_row(row: &SqliteRow) -> Database {
    Database {
        id: row.get("id"),
        verbose_name: row.get("verbose_name"),
        database_name: row.get("database_name"),
        sqlalchemy_uri: row.get("sqlalchemy_uri"),
        password: row.get("password"),
        audit: audit_from_row(row),
    }
}

fn file_dir_from_row(row: &SqliteRow) -> FileDir {
    FileDir {
        id: row.get("id"),
        name: row.get("name"),
        path: row.get("path"),
        audit: audit_from_row(row),
    }
}

fn partition_value_from_row(row: &SqliteRow) -> PartitionValue {
    PartitionValue {
        id: row.get("id"),
        name: row.get("name"),
        format_date: row.get("format_date"),
        forward_days: row.get("forward_days"),
        slice_format: row.get("slice_format"),
        audit: audit_from_row(row),
    }
}

fn partition_key_from_row(row: &SqliteRow) -> PartitionKey {
    PartitionKey {
        id: row.get("id"),
        field: row.get("field"),
        default_value_id: row.get("default_value_id"),
        audit: audit_from_row(row),
    }
}

fn default_config_from_row(row: &SqliteRow) -> DefaultFetchConfig {
    DefaultFetchConfig {
        id: row.get("id"),
        name: row.get("name"),
        fields_terminated_by: row.get("fields_terminated_by"),
        null_string: row.get("null_string"),
        null_non_string: row.get("null_non_string"),
        hive_delims_replacement: row.get("hive_delims_replacement"),
        audit: audit_from_row(row),
    }
}

fn fetch_from_row(row: &SqliteRow) -> Fetch {
    Fetch {
        id: row.get("id"),
        fetch_name: row.get("fetch_name"),
        database_id: row.get("database_id"),
        source_table: row.get("source_table"),
        query: row.get("query"),
        split_by: row.get("split_by"),
        delete_target_dir: row.get("delete_target_dir"),
        target_dir: row.get("target_dir"),
        hive_database: row.get("hive_database"),
        hive_table: row.get("hive_table"),
        partition_key_id: row.get("partition_key_id"),
        hive_overwrite: row.get("hive_overwrite"),
        direct: row.get("direct"),
        m: row.get("m"),
        outdir: row.get("outdir"),
        extra_config: row.get("extra_config"),
        file_dir_id: row.get("file_dir_id"),
        default_config_id: row.get("default_config_id"),
        audit: audit_from_row(row),
    }
}

#[instrument(skip_all)]
pub async fn insert_database(conn: &mut SqliteConnection, db: &Database) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO dbs (verbose_name, database_name, sqlalchemy_uri, password, created_by, changed_by) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&db.verbose_name)
    .bind(&db.database_name)
    .bind(&db.sqlalchemy_uri)
    .bind(&db.password)
    .bind(&db.audit.created_by)
    .bind(&db.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert database {}", db.database_name))?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_file_dir(conn: &mut SqliteConnection, dir: &FileDir) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO file_dirs (name, path, created_by, changed_by) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(&dir.name)
    .bind(&dir.path)
    .bind(&dir.audit.created_by)
    .bind(&dir.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert file dir {}", dir.name))?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_partition_value(conn: &mut SqliteConnection, value: &PartitionValue) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO partition_values (name, format_date, forward_days, slice_format, created_by, changed_by) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&value.name)
    .bind(&value.format_date)
    .bind(value.forward_days)
    .bind(&value.slice_format)
    .bind(&value.audit.created_by)
    .bind(&value.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert partition value {}", value.name))?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_partition_key(conn: &mut SqliteConnection, key: &PartitionKey) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO partition_keys (field, default_value_id, created_by, changed_by) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(&key.field)
    .bind(key.default_value_id)
    .bind(&key.audit.created_by)
    .bind(&key.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert partition key {}", key.field))?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_default_config(conn: &mut SqliteConnection, cfg: &DefaultFetchConfig) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO default_fetch_configs \
         (name, fields_terminated_by, null_string, null_non_string, hive_delims_replacement, created_by, changed_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&cfg.name)
    .bind(&cfg.fields_terminated_by)
    .bind(&cfg.null_string)
    .bind(&cfg.null_non_string)
    .bind(&cfg.hive_delims_replacement)
    .bind(&cfg.audit.created_by)
    .bind(&cfg.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert default config {}", cfg.name))?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_fetch(conn: &mut SqliteConnection, fetch: &Fetch) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO fetches (fetch_name, database_id, source_table, query, split_by, delete_target_dir, \
         target_dir, hive_database, hive_table, partition_key_id, hive_overwrite, direct, m, outdir, \
         extra_config, file_dir_id, default_config_id, created_by, changed_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&fetch.fetch_name)
    .bind(fetch.database_id)
    .bind(&fetch.source_table)
    .bind(&fetch.query)
    .bind(&fetch.split_by)
    .bind(&fetch.delete_target_dir)
    .bind(&fetch.target_dir)
    .bind(&fetch.hive_database)
    .bind(&fetch.hive_table)
    .bind(fetch.partition_key_id)
    .bind(fetch.hive_overwrite)
    .bind(fetch.direct)
    .bind(fetch.m)
    .bind(&fetch.outdir)
    .bind(&fetch.extra_config)
    .bind(fetch.file_dir_id)
    .bind(fetch.default_config_id)
    .bind(&fetch.audit.created_by)
    .bind(&fetch.audit.changed_by)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert fetch {}", fetch.fetch_name))?;
    Ok(id)
}

/// Ids of the rows in `table` whose `column` equals `value`. Only used with
/// the fixed table/column pairs below.
async fn ids_by(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    value: &str,
) -> Result<Vec<i64>> {
    let sql = format!("SELECT id FROM {table} WHERE {column} = ? ORDER BY id");
    let ids = sqlx::query_scalar::<_, i64>(&sql)
        .bind(value)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Like [`ids_by`], but more than one match is an error instead of a guess.
async fn id_by(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    value: &str,
) -> Result<Option<i64>> {
    let ids = ids_by(conn, table, column, value).await?;
    match ids.as_slice() {
        [] => Ok(None),
        [id] => Ok(Some(*id)),
        _ => bail!(
            "{} rows in {table} have {column} '{value}', cannot tell which one is meant",
            ids.len()
        ),
    }
}

pub async fn database_id(conn: &mut SqliteConnection, database_name: &str) -> Result<Option<i64>> {
    id_by(conn, "dbs", "database_name", database_name).await
}

pub async fn file_dir_id(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    id_by(conn, "file_dirs", "name", name).await
}

pub async fn partition_value_id(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    id_by(conn, "partition_values", "name", name).await
}

/// `partition_keys.field` is not unique (`dt` may be bound to different
/// values), so a field shared by several keys is rejected.
pub async fn partition_key_id(conn: &mut SqliteConnection, field: &str) -> Result<Option<i64>> {
    id_by(conn, "partition_keys", "field", field).await
}

pub async fn default_config_id(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    id_by(conn, "default_fetch_configs", "name", name).await
}

#[instrument(skip_all)]
pub async fn get_partition_value(pool: &Pool, name: &str) -> Result<Option<PartitionValue>> {
    let row = sqlx::query("SELECT * FROM partition_values WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(partition_value_from_row))
}

async fn get_partition_value_by_id(pool: &Pool, id: i64) -> Result<Option<PartitionValue>> {
    let row = sqlx::query("SELECT * FROM partition_values WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(partition_value_from_row))
}

/// Loads a Fetch and every row it references. Returns `None` when no Fetch
/// has this name; a reference to a row that no longer exists is an error.
#[instrument(skip_all, fields(fetch_name = %fetch_name))]
pub async fn get_fetch_bundle(pool: &Pool, fetch_name: &str) -> Result<Option<FetchBundle>> {
    let row = sqlx::query("SELECT * FROM fetches WHERE fetch_name = ?")
        .bind(fetch_name)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let fetch = fetch_from_row(&row);
    let dangling = |what: &str, id: i64| anyhow!("fetch {fetch_name} references missing {what} {id}");

    let database = sqlx::query("SELECT * FROM dbs WHERE id = ?")
        .bind(fetch.database_id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(database_from_row)
        .ok_or_else(|| dangling("database", fetch.database_id))?;

    let file_dir = match fetch.file_dir_id {
        Some(id) => Some(
            sqlx::query("SELECT * FROM file_dirs WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(file_dir_from_row)
                .ok_or_else(|| dangling("file dir", id))?,
        ),
        None => None,
    };

    let partition_key = match fetch.partition_key_id {
        Some(id) => Some(
            sqlx::query("SELECT * FROM partition_keys WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(partition_key_from_row)
                .ok_or_else(|| dangling("partition key", id))?,
        ),
        None => None,
    };

    let partition_value = match partition_key.as_ref().and_then(|k| k.default_value_id) {
        Some(id) => Some(
            get_partition_value_by_id(pool, id)
                .await?
                .ok_or_else(|| dangling("partition value", id))?,
        ),
        None => None,
    };

    let default_config = match fetch.default_config_id {
        Some(id) => Some(
            sqlx::query("SELECT * FROM default_fetch_configs WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(default_config_from_row)
                .ok_or_else(|| dangling("default config", id))?,
        ),
        None => None,
    };

    Ok(Some(FetchBundle {
        fetch,
        database,
        file_dir,
        partition_key,
        partition_value,
        default_config,
    }))
}

#[instrument(skip_all)]
pub async fn list_fetches(pool: &Pool) -> Result<Vec<FetchSummary>> {
    let rows = sqlx::query(
        "SELECT f.fetch_name, COALESCE(NULLIF(d.verbose_name, ''), d.database_name) AS database_name, \
                f.hive_table, f.created_by, f.changed_on \
         FROM fetches f JOIN dbs d ON d.id = f.database_id \
         ORDER BY f.fetch_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| FetchSummary {
            fetch_name: row.get("fetch_name"),
            database_name: row.get("database_name"),
            hive_table: row.get("hive_table"),
            created_by: row.get("created_by"),
            changed_on: row
                .try_get::<Option<NaiveDateTime>, _>("changed_on")
                .ok()
                .flatten(),
        })
        .collect())
}
