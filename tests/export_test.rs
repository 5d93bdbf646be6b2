mod common;

use common::{day, seeded_pool};
use union_fetch::model::FileDir;
use union_fetch::runner;
use union_fetch::{ScriptComposer, SqliteStore};

#[tokio::test]
async fn export_prefers_file_dir() {
    let td = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(seeded_pool().await);
    let (mut bundle, script) = ScriptComposer::default()
        .generate_for("orders", &store, day(2024, 3, 2))
        .await
        .unwrap();
    let nightly = td.path().join("nightly");
    bundle.file_dir = Some(FileDir {
        name: "nightly".into(),
        path: nightly.to_string_lossy().to_string(),
        ..Default::default()
    });

    let path = runner::export_script(&bundle, &script, &td.path().join("jobs"))
        .await
        .unwrap();
    assert_eq!(path, nightly.join("orders.sh"));

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("#!/bin/sh\nsqoop import "));
    assert!(body.contains("--hive-partition-value '20240301'"));
}

#[tokio::test]
async fn export_falls_back_to_job_dir() {
    let td = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(seeded_pool().await);
    let (bundle, script) = ScriptComposer::default()
        .generate_for("customers", &store, day(2024, 3, 2))
        .await
        .unwrap();
    assert!(bundle.file_dir.is_none());

    let jobs = td.path().join("jobs");
    let path = runner::export_script(&bundle, &script, &jobs).await.unwrap();
    assert_eq!(path, jobs.join("customers.sh"));
    assert!(path.exists());
}

#[tokio::test]
async fn exported_script_splits_into_argv() {
    let store = SqliteStore::new(seeded_pool().await);
    let (_, script) = ScriptComposer::default()
        .generate_for("orders", &store, day(2024, 3, 2))
        .await
        .unwrap();
    let argv = runner::script_argv(&script).unwrap();
    assert_eq!(argv[0], "sqoop");
    assert_eq!(argv[1], "import");
    let q = argv.iter().position(|a| a == "--query").unwrap();
    assert_eq!(argv[q + 1], "select * from orders where $CONDITIONS");
    let p = argv.iter().position(|a| a == "--hive-partition-value").unwrap();
    assert_eq!(argv[p + 1], "20240301");
}
