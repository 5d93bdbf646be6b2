//! Launching and exporting generated scripts.
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;
use tracing::{info, instrument};

use crate::compose::LINE_CONTINUATION;
use crate::db::FetchBundle;

/// Splits a generated script into argv words, honouring shell quoting.
pub fn script_argv(script: &str) -> Result<Vec<String>> {
    let flat = script.replace(LINE_CONTINUATION, " ");
    let words = shlex::split(&flat).ok_or_else(|| anyhow!("script has unbalanced quotes"))?;
    if words.is_empty() {
        bail!("script is empty");
    }
    Ok(words)
}

/// Starts the script's program without a shell and returns its pid. The
/// child is not awaited; its output goes to our stdout/stderr.
#[instrument(skip_all)]
pub fn run_script(script: &str) -> Result<u32> {
    let argv = script_argv(script)?;
    let child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to start {}", argv[0]))?;
    let pid = child.id().unwrap_or_default();
    info!(pid, program = %argv[0], "launched import");
    Ok(pid)
}

/// Where `export_script` writes a Fetch's script: its FileDir when it has
/// one, otherwise `job_dir`.
pub fn script_path(bundle: &FetchBundle, job_dir: &Path) -> PathBuf {
    let dir = bundle
        .file_dir
        .as_ref()
        .filter(|d| !d.path.trim().is_empty())
        .map(|d| PathBuf::from(&d.path))
        .unwrap_or_else(|| job_dir.to_path_buf());
    dir.join(format!("{}.sh", bundle.fetch.fetch_name))
}

#[instrument(skip_all, fields(fetch_name = %bundle.fetch.fetch_name))]
pub async fn export_script(bundle: &FetchBundle, script: &str, job_dir: &Path) -> Result<PathBuf> {
    let path = script_path(bundle, job_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let body = format!("#!/bin/sh\n{script}\n");
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).await?;
    }
    info!(path = %path.display(), "exported script");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_respects_quotes_and_continuations() {
        let script = "sqoop import --connect jdbc:mysql://h:3306/d \\\n--query \"select a, b from t where $CONDITIONS\" \\\n--hive-partition-value '20240301' ";
        let argv = script_argv(script).unwrap();
        assert_eq!(
            argv,
            vec![
                "sqoop",
                "import",
                "--connect",
                "jdbc:mysql://h:3306/d",
                "--query",
                "select a, b from t where $CONDITIONS",
                "--hive-partition-value",
                "20240301",
            ]
        );
    }

    #[test]
    fn fragments_without_trailing_space_stay_separate() {
        let script = "sqoop import \\\n--compress\\\n--where \"year = 2024\"";
        let argv = script_argv(script).unwrap();
        assert_eq!(argv, vec!["sqoop", "import", "--compress", "--where", "year = 2024"]);
    }

    #[test]
    fn unbalanced_quotes_rejected() {
        assert!(script_argv("sqoop import --query \"oops").is_err());
    }

    #[test]
    fn empty_script_rejected() {
        assert!(script_argv(" \\\n ").is_err());
    }

    #[tokio::test]
    async fn run_script_spawns_program() {
        let pid = run_script("true \\\n--ignored ").unwrap();
        assert!(pid > 0);
    }

    #[tokio::test]
    async fn run_script_reports_missing_program() {
        assert!(run_script("definitely-not-a-real-binary-4f1c ").is_err());
    }
}
