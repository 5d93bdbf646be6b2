use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use union_fetch::catalog;
use union_fetch::config;
use union_fetch::db;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load databases, partition values and fetches from a YAML catalog"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Catalog file to import
    #[arg(long)]
    catalog: PathBuf,

    /// Recorded as created_by/changed_by on every imported row
    #[arg(long)]
    author: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let entries = catalog::load(&args.catalog)?;
    let report = catalog::import(&pool, &entries, args.author.as_deref()).await?;
    info!(
        fetches = report.fetches,
        databases = report.databases,
        partition_values = report.partition_values,
        "import finished"
    );
    Ok(())
}
