//! Per-object export processing.
//!
//! One worker owns one object from dequeue to completion, so ordering
//! within an object's output (DDL before data) needs no coordination; the
//! sink locks only prevent byte interleaving between objects sharing a
//! stream.

use super::batch::InsertBatcher;
use super::sink::{SinkSet, banner};
use crate::Result;
use crate::export::ExportOptions;
use crate::models::{ObjectKind, SchemaObject};
use crate::values::{decode_column, quote_ident};
use futures::TryStreamExt;
use sqlx::{Column, Executor, MySqlPool, Row};
use std::time::Duration;

/// Probes the pool before a task, retrying a bounded number of times.
///
/// A dead connection is reported by the task's own queries; the probe only
/// buys time for a briefly unavailable server, so it never fails hard.
pub(crate) async fn wait_until_live(pool: &MySqlPool, retries: u32, backoff: Duration) {
    for attempt in 0..retries {
        match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("Liveness probe failed (attempt {}): {}", attempt + 1, e);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Exports one schema object to its stream(s).
pub(crate) async fn process_object(
    pool: &MySqlPool,
    sinks: &SinkSet,
    options: &ExportOptions,
    object: &SchemaObject,
) -> Result<()> {
    match object.kind {
        ObjectKind::Table => export_table(pool, sinks, options, &object.name).await,
        ObjectKind::View => export_view(pool, sinks, &object.name).await,
        ObjectKind::Procedure | ObjectKind::Function => {
            export_routine(pool, sinks, object.kind, &object.name).await
        }
    }
}

/// Exports a table: introspected DDL, then all rows as batched multi-row
/// INSERT statements.
async fn export_table(
    pool: &MySqlPool,
    sinks: &SinkSet,
    options: &ExportOptions,
    name: &str,
) -> Result<()> {
    let show_query = format!("SHOW CREATE TABLE {}", quote_ident(name));
    let row = sqlx::query(&show_query).fetch_one(pool).await.map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to fetch create statement for table '{}'", name),
            e,
        )
    })?;
    let ddl: String = row.try_get(1).map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to parse create statement for table '{}'", name),
            e,
        )
    })?;

    let select_query = format!("SELECT * FROM {}", quote_ident(name));
    let mut rows = sqlx::query(&select_query).fetch(pool);

    // First poll executes the query; a select failure surfaces here, before
    // anything is written for this object.
    let first = rows.try_next().await.map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to select data from table '{}'", name),
            e,
        )
    })?;

    let mut header = banner("TABLE", name);
    header.push_str(&ddl);
    header.push_str(";\n\n");
    header.push_str("-- DATA\n");
    sinks.table.write_statement(&header)?;

    let Some(first) = first else {
        return Ok(());
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut batcher = InsertBatcher::new(name, &columns, options.batch_size);

    let mut row = Some(first);
    while let Some(current) = row {
        if let Some(tuple) = render_tuple(&current, name) {
            if let Some(statement) = batcher.push(tuple) {
                sinks.table.write_statement(&statement)?;
            }
        }
        row = rows.try_next().await.map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to read rows from table '{}'", name),
                e,
            )
        })?;
    }

    if let Some(statement) = batcher.finish() {
        sinks.table.write_statement(&statement)?;
    }

    Ok(())
}

/// Renders one row as a parenthesized value tuple.
///
/// A row that fails to decode is skipped (logged, not fatal); the batch
/// continues with the remaining rows.
fn render_tuple(row: &sqlx::mysql::MySqlRow, table: &str) -> Option<String> {
    let mut rendered = Vec::with_capacity(row.columns().len());
    for index in 0..row.columns().len() {
        match decode_column(row, index) {
            Ok(value) => rendered.push(value.render()),
            Err(e) => {
                tracing::debug!("Skipping row of '{}': {}", table, e);
                return None;
            }
        }
    }
    Some(format!("({})", rendered.join(", ")))
}

/// Exports a view: a placeholder structure table to the viewddl stream and
/// the real create statement (behind a DROP guard) to the view stream.
async fn export_view(pool: &MySqlPool, sinks: &SinkSet, name: &str) -> Result<()> {
    // Zero-row probe, used only to recover column names/types/nullability.
    let probe_query = format!("SELECT * FROM {} LIMIT 0", quote_ident(name));
    let describe = pool.describe(&probe_query).await.map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to probe columns of view '{}'", name),
            e,
        )
    })?;

    let mut structure = format!(
        "-- ----------------------------\n--  STRUCTURE (DUMMY TABLE FOR VIEW): {}\n-- ----------------------------\n",
        name
    );
    structure.push_str(&format!("CREATE TABLE {} (\n", quote_ident(name)));
    let columns = describe.columns();
    for (index, column) in columns.iter().enumerate() {
        use sqlx::TypeInfo;
        let nullable = describe.nullable(index).unwrap_or(false);
        let null_str = if nullable { "NULL" } else { "NOT NULL" };
        structure.push_str(&format!(
            "  {} {} {}",
            quote_ident(column.name()),
            placeholder_type(column.type_info().name()),
            null_str
        ));
        structure.push_str(if index < columns.len() - 1 { ",\n" } else { "\n" });
    }
    structure.push_str(");\n\n");

    let show_query = format!("SHOW CREATE VIEW {}", quote_ident(name));
    let row = sqlx::query(&show_query).fetch_one(pool).await.map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to fetch create statement for view '{}'", name),
            e,
        )
    })?;
    let ddl: String = row.try_get(1).map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to parse create statement for view '{}'", name),
            e,
        )
    })?;

    sinks.viewddl.write_statement_flush(&structure)?;

    let mut out = banner("VIEW", name);
    out.push_str(&format!("DROP TABLE IF EXISTS {};\n", quote_ident(name)));
    out.push_str(&ddl);
    out.push_str(";\n\n");
    sinks.view.write_statement_flush(&out)?;

    Ok(())
}

/// Exports a routine's native create statement, wrapped in a DELIMITER
/// guard so multi-statement bodies survive replay by tools that split on
/// `;`.
async fn export_routine(
    pool: &MySqlPool,
    sinks: &SinkSet,
    kind: ObjectKind,
    name: &str,
) -> Result<()> {
    let show_query = format!("SHOW CREATE {} {}", kind.as_str(), quote_ident(name));
    let row = sqlx::query(&show_query).fetch_one(pool).await.map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!(
                "Failed to fetch create statement for {} '{}'",
                kind.as_str(),
                name
            ),
            e,
        )
    })?;
    // Column 2 is the create statement; NULL when the account lacks
    // privileges on the routine body.
    let ddl: String = row.try_get(2).map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!(
                "Failed to parse create statement for {} '{}'",
                kind.as_str(),
                name
            ),
            e,
        )
    })?;

    let sink = match kind {
        ObjectKind::Procedure => &sinks.procedure,
        _ => &sinks.function,
    };

    let mut out = banner(kind.as_str(), name);
    out.push_str("DELIMITER //\n");
    out.push_str(&ddl);
    out.push_str(";\n\n");
    out.push_str("// \nDELIMITER ;\n");
    sink.write_statement(&out)?;

    Ok(())
}

/// Coarse type mapping for view placeholder structures.
fn placeholder_type(mysql_type: &str) -> &'static str {
    match mysql_type.to_uppercase().as_str() {
        "VARCHAR" | "TEXT" | "CHAR" => "VARCHAR(1)",
        "INT" | "INTEGER" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "BIGINT" => "INT(11)",
        "DECIMAL" | "NUMERIC" | "FLOAT" | "DOUBLE" => "DECIMAL(10,2)",
        "DATE" => "DATE",
        "DATETIME" | "TIMESTAMP" => "DATETIME",
        "BLOB" | "LONGBLOB" | "MEDIUMBLOB" => "BLOB",
        _ => "VARCHAR(1)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_type_mapping() {
        assert_eq!(placeholder_type("varchar"), "VARCHAR(1)");
        assert_eq!(placeholder_type("TEXT"), "VARCHAR(1)");
        assert_eq!(placeholder_type("BIGINT"), "INT(11)");
        assert_eq!(placeholder_type("float"), "DECIMAL(10,2)");
        assert_eq!(placeholder_type("DATE"), "DATE");
        assert_eq!(placeholder_type("TIMESTAMP"), "DATETIME");
        assert_eq!(placeholder_type("LONGBLOB"), "BLOB");
        assert_eq!(placeholder_type("GEOMETRY"), "VARCHAR(1)");
    }
}
