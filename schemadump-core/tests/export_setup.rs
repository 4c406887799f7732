//! Setup-failure behavior of the export orchestrator: a dead server must
//! produce exactly one error event and a closed progress stream, with no
//! output files left behind by a partially constructed run.

use schemadump_core::{ExportOptions, Exporter, MySqlCatalog, SchemaObject, Severity};

#[tokio::test]
async fn connect_failure_emits_single_error_and_closes_stream() {
    // Port 1 refuses connections; the pool is lazy, so construction works
    // and the failure surfaces inside the export run.
    let catalog = MySqlCatalog::new("mysql://root@127.0.0.1:1/sales?connect_timeout=1")
        .await
        .unwrap();
    let exporter = Exporter::new(&catalog, "sales", ExportOptions::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("dump").to_string_lossy().into_owned();
    let objects = vec![SchemaObject::new(
        "orders",
        schemadump_core::ObjectKind::Table,
    )];

    let mut progress = exporter.start(prefix, objects);

    let first = progress.recv().await.expect("expected one event");
    assert_eq!(first.severity, Severity::Error);
    assert!(first.text.contains("Failed to connect to DB"));

    // Terminal state: stream closes after the fatal event.
    assert!(progress.recv().await.is_none());

    // No partial setup: the sinks were never opened.
    assert!(!dir.path().join("dump_table.gz").exists());
}

#[tokio::test]
async fn invalid_database_name_fails_at_construction() {
    let catalog = MySqlCatalog::new("mysql://root@127.0.0.1:1/sales?connect_timeout=1")
        .await
        .unwrap();
    assert!(Exporter::new(&catalog, "bad;name", ExportOptions::default()).is_err());
    assert!(Exporter::new(&catalog, "", ExportOptions::default()).is_err());
}

#[tokio::test]
async fn invalid_options_fail_at_construction() {
    let catalog = MySqlCatalog::new("mysql://root@127.0.0.1:1/sales?connect_timeout=1")
        .await
        .unwrap();
    let options = ExportOptions {
        workers: 0,
        ..ExportOptions::default()
    };
    assert!(Exporter::new(&catalog, "sales", options).is_err());
}
