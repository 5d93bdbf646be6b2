//! Configuration loader and validator for the Union fetch tools.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub sqoop: Sqoop,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Holds the catalog database unless `DATABASE_URL` is set.
    pub data_dir: String,
    /// Default destination for exported scripts.
    pub job_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sqoop {
    pub binary: String,
}

impl Default for Sqoop {
    fn default() -> Self {
        Self {
            binary: crate::compose::DEFAULT_BINARY.to_string(),
        }
    }
}

fn expand_home(path: &str) -> String {
    // Only a leading ~/ is expanded; ~user is left alone
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

impl App {
    pub fn resolved_data_dir(&self) -> String {
        expand_home(&self.data_dir)
    }

    pub fn resolved_job_dir(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.job_dir))
    }
}

impl Config {
    /// Ensure `app.data_dir` and `app.job_dir` exist.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.app.resolved_data_dir())?;
        fs::create_dir_all(self.app.resolved_job_dir())
    }

    /// `DATABASE_URL` when set, otherwise `union.db` under the data dir.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/union.db", self.app.resolved_data_dir()))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    // A missing sqoop section falls back to its default
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.job_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.job_dir must be non-empty"));
    }
    // The binary may be a bare name resolved via PATH
    if cfg.sqoop.binary.trim().is_empty() {
        return Err(ConfigError::Invalid("sqoop.binary must be non-empty"));
    }
    Ok(())
}

/// Example configuration, also used by tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  job_dir: "./jobs"

sqoop:
  binary: "sqoop"
"#
}
