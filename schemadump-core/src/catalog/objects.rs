//! Database and schema-object enumeration.

use super::MySqlCatalog;
use crate::Result;
use crate::models::{ObjectKind, SchemaObject};
use sqlx::Row;

/// Enumerates databases visible to the connected account.
pub(crate) async fn list_databases(catalog: &MySqlCatalog) -> Result<Vec<String>> {
    let query = "SHOW DATABASES";
    catalog.record_history(query, "");

    let rows = sqlx::query(query)
        .fetch_all(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed("Failed to enumerate databases", e)
        })?;

    let mut databases = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.try_get(0).map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed("Failed to parse database name", e)
        })?;
        databases.push(name);
    }

    Ok(databases)
}

/// Enumerates all exportable objects of one database in a single query.
///
/// Base tables, views, procedures, and functions are unioned and tagged
/// with their kind. The row order is whatever the catalog returns; display
/// and export sequencing is applied by the caller.
pub(crate) async fn list_objects(
    catalog: &MySqlCatalog,
    db_name: &str,
) -> Result<Vec<SchemaObject>> {
    // Cast to CHAR to avoid VARBINARY type issues in MySQL 8.0+
    let objects_query = r#"
        SELECT CAST(TABLE_NAME AS CHAR) AS NAME, 'TABLE' AS KIND
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
        UNION ALL
        SELECT CAST(TABLE_NAME AS CHAR) AS NAME, 'VIEW' AS KIND
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'VIEW'
        UNION ALL
        SELECT CAST(ROUTINE_NAME AS CHAR) AS NAME, 'PROCEDURE' AS KIND
        FROM INFORMATION_SCHEMA.ROUTINES
        WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = 'PROCEDURE'
        UNION ALL
        SELECT CAST(ROUTINE_NAME AS CHAR) AS NAME, 'FUNCTION' AS KIND
        FROM INFORMATION_SCHEMA.ROUTINES
        WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = 'FUNCTION'
    "#;
    catalog.record_history(objects_query, db_name);

    let rows = sqlx::query(objects_query)
        .bind(db_name)
        .bind(db_name)
        .bind(db_name)
        .bind(db_name)
        .fetch_all(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to enumerate objects of '{}'", db_name),
                e,
            )
        })?;

    let mut objects = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.try_get("NAME").map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed("Failed to parse object name", e)
        })?;
        let kind_str: String = row.try_get("KIND").map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed("Failed to parse object kind", e)
        })?;
        let kind: ObjectKind = kind_str.parse()?;
        objects.push(SchemaObject::new(name, kind));
    }

    tracing::debug!("Enumerated {} objects in '{}'", objects.len(), db_name);

    Ok(objects)
}
