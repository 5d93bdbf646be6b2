use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use union_fetch::config;
use union_fetch::db;
use union_fetch::{audit, runner, ScriptComposer, SqliteStore};

#[derive(Debug, Parser)]
#[command(author, version, about = "Generate and launch Sqoop import scripts for stored fetches")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the generated script
    Script {
        #[arg(short, long)]
        fetch: String,
        /// Resolve partition values as of this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Generate the script and launch it without waiting for it to finish
    Run {
        #[arg(short, long)]
        fetch: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Write the script to the fetch's file dir (or the configured job dir)
    Export {
        #[arg(short, long)]
        fetch: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List stored fetches
    List {
        /// Print as JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },
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
    let store = SqliteStore::new(pool.clone());
    let composer = ScriptComposer::new(cfg.sqoop.binary.clone());
    let today = |date: Option<NaiveDate>| date.unwrap_or_else(|| Local::now().date_naive());

    match args.command {
        Command::Script { fetch, date } => {
            let (_, script) = composer.generate_for(&fetch, &store, today(date)).await?;
            println!("{script}");
        }
        Command::Run { fetch, date } => {
            let (_, script) = composer.generate_for(&fetch, &store, today(date)).await?;
            match runner::run_script(&script) {
                Ok(pid) => info!(fetch = %fetch, pid, "fetch started"),
                Err(err) => {
                    error!(?err, fetch = %fetch, "failed to start fetch");
                    return Err(err);
                }
            }
        }
        Command::Export { fetch, date } => {
            let (bundle, script) = composer.generate_for(&fetch, &store, today(date)).await?;
            let path = runner::export_script(&bundle, &script, &cfg.app.resolved_job_dir()).await?;
            println!("{}", path.display());
        }
        Command::List { json } => {
            let rows = db::list_fetches(&pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            let now = Utc::now();
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    row.fetch_name,
                    row.database_name,
                    row.hive_table.as_deref().unwrap_or("-"),
                    audit::creator_label(row.created_by.as_deref()),
                    audit::time_ago(row.changed_on, now),
                );
            }
        }
    }

    Ok(())
}
