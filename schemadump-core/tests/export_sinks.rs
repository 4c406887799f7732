//! Integration tests for the export output path: gzip sinks, batch
//! flushing, and concurrent-writer safety against real files.

use flate2::read::GzDecoder;
use schemadump_core::export::batch::InsertBatcher;
use schemadump_core::export::sink::{SinkSet, banner};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

fn read_gz(path: &std::path::Path) -> String {
    let mut decoder = GzDecoder::new(std::fs::File::open(path).unwrap());
    let mut contents = String::new();
    decoder.read_to_string(&mut contents).unwrap();
    contents
}

#[test]
fn kind_streams_are_segregated() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("dump").to_string_lossy().into_owned();

    let sinks = SinkSet::open(&prefix).unwrap();

    let table_stmt = format!("{}CREATE TABLE `orders` (`id` INT);\n\n", banner("TABLE", "orders"));
    sinks.table.write_statement(&table_stmt).unwrap();

    let structure = "CREATE TABLE `v_orders` (\n  `id` INT(11) NOT NULL\n);\n\n";
    sinks.viewddl.write_statement_flush(structure).unwrap();
    let view_stmt = format!(
        "{}DROP TABLE IF EXISTS `v_orders`;\nCREATE VIEW `v_orders` AS SELECT 1;\n\n",
        banner("VIEW", "v_orders")
    );
    sinks.view.write_statement_flush(&view_stmt).unwrap();

    sinks
        .procedure
        .write_statement("DELIMITER //\nCREATE PROCEDURE `p1`() BEGIN END;\n// \nDELIMITER ;\n")
        .unwrap();
    sinks
        .function
        .write_statement("DELIMITER //\nCREATE FUNCTION `f1`() RETURNS INT RETURN 1;\n// \nDELIMITER ;\n")
        .unwrap();

    sinks.finish().unwrap();

    let table = read_gz(&dir.path().join("dump_table.gz"));
    let view = read_gz(&dir.path().join("dump_view.gz"));
    let viewddl = read_gz(&dir.path().join("dump_viewddl.gz"));
    let procedure = read_gz(&dir.path().join("dump_procedure.gz"));
    let function = read_gz(&dir.path().join("dump_function.gz"));

    assert!(table.contains("-- TABLE: orders"));
    assert!(!table.contains("VIEW"));

    assert!(view.contains("DROP TABLE IF EXISTS `v_orders`"));
    assert!(viewddl.contains("`v_orders`"));
    assert!(!viewddl.contains("DROP TABLE"));

    assert!(procedure.contains("CREATE PROCEDURE `p1`"));
    assert!(!procedure.contains("FUNCTION"));
    assert!(function.contains("CREATE FUNCTION `f1`"));
    assert!(!function.contains("PROCEDURE"));
}

#[test]
fn concurrent_writers_never_tear_statements() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("dump").to_string_lossy().into_owned();

    let sinks = Arc::new(SinkSet::open(&prefix).unwrap());
    let writers = 8;
    let statements_per_writer = 50;

    let mut expected = HashSet::new();
    for w in 0..writers {
        for s in 0..statements_per_writer {
            // Varied lengths so torn writes would misalign lines.
            let payload = "x".repeat(1 + (w * statements_per_writer + s) % 97);
            expected.insert(format!(
                "INSERT INTO `t` (`c`) VALUES ('w{}-{}-{}');",
                w, s, payload
            ));
        }
    }

    let mut handles = Vec::new();
    for w in 0..writers {
        let sinks = Arc::clone(&sinks);
        handles.push(std::thread::spawn(move || {
            for s in 0..statements_per_writer {
                let payload = "x".repeat(1 + (w * statements_per_writer + s) % 97);
                let statement = format!(
                    "INSERT INTO `t` (`c`) VALUES ('w{}-{}-{}');\n",
                    w, s, payload
                );
                sinks.table.write_statement(&statement).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    Arc::try_unwrap(sinks).unwrap().finish().unwrap();

    let contents = read_gz(&dir.path().join("dump_table.gz"));
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), writers * statements_per_writer);

    for line in lines {
        assert!(
            expected.remove(line),
            "torn or duplicated statement: {}",
            line
        );
    }
    assert!(expected.is_empty());
}

#[test]
fn batched_inserts_round_trip_through_sink() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("dump").to_string_lossy().into_owned();

    let sinks = SinkSet::open(&prefix).unwrap();
    let columns = vec!["id".to_string()];
    let mut batcher = InsertBatcher::new("big", &columns, 1000);

    for i in 0..2500 {
        if let Some(statement) = batcher.push(format!("({})", i)) {
            sinks.table.write_statement(&statement).unwrap();
        }
    }
    if let Some(statement) = batcher.finish() {
        sinks.table.write_statement(&statement).unwrap();
    }
    sinks.finish().unwrap();

    let contents = read_gz(&dir.path().join("dump_table.gz"));
    assert_eq!(contents.matches("INSERT INTO `big` (`id`) VALUES").count(), 3);

    let tuple_counts: Vec<usize> = contents
        .split("INSERT INTO")
        .skip(1)
        .map(|chunk| chunk.matches("\n(").count())
        .collect();
    assert_eq!(tuple_counts, vec![1000, 1000, 500]);
}
