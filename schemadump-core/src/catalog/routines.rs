//! Routine metadata, parameters, and return-type resolution.
//!
//! The catalog exposes stored routines only as fragments (attributes on the
//! routine row, parameters in a separate table); this module fetches those
//! fragments in the shape the DDL reconstructor needs. Parameter order is
//! the catalog ordinal order and is never re-sorted: it is the call
//! signature.

use super::MySqlCatalog;
use crate::Result;
use crate::models::{ObjectKind, Parameter, ParameterMode, RoutineMetadata};
use sqlx::Row;

/// Fetches routine-level attributes and the ordered parameter list.
pub(crate) async fn routine_metadata(
    catalog: &MySqlCatalog,
    name: &str,
    db_name: &str,
    kind: ObjectKind,
) -> Result<(RoutineMetadata, Vec<Parameter>)> {
    if !matches!(kind, ObjectKind::Procedure | ObjectKind::Function) {
        return Err(crate::error::SchemaDumpError::UnsupportedRoutineKind {
            kind: kind.as_str().to_string(),
        });
    }

    // Cast to CHAR to avoid VARBINARY type issues in MySQL 8.0+
    let routine_query = r#"
        SELECT
            CAST(ROUTINE_NAME AS CHAR) AS ROUTINE_NAME,
            CAST(DATA_TYPE AS CHAR) AS DATA_TYPE,
            CAST(IS_DETERMINISTIC AS CHAR) AS IS_DETERMINISTIC,
            CAST(SECURITY_TYPE AS CHAR) AS SECURITY_TYPE,
            CAST(DEFINER AS CHAR) AS DEFINER,
            CAST(ROUTINE_DEFINITION AS CHAR) AS ROUTINE_DEFINITION
        FROM INFORMATION_SCHEMA.ROUTINES
        WHERE ROUTINE_NAME = ?
          AND ROUTINE_SCHEMA = ?
          AND ROUTINE_TYPE = ?
    "#;
    catalog.record_history(routine_query, db_name);

    let row = sqlx::query(routine_query)
        .bind(name)
        .bind(db_name)
        .bind(kind.as_str())
        .fetch_optional(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to fetch metadata for routine '{}'", name),
                e,
            )
        })?;

    let Some(row) = row else {
        return Err(crate::error::SchemaDumpError::RoutineNotFound {
            name: name.to_string(),
        });
    };

    let routine_name: String = row.try_get("ROUTINE_NAME").map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed("Failed to parse routine name", e)
    })?;
    let return_type: Option<String> = row.try_get("DATA_TYPE").ok();
    let is_deterministic: String = row.try_get("IS_DETERMINISTIC").unwrap_or_default();
    let security_type: String = row.try_get("SECURITY_TYPE").unwrap_or_default();
    let definer: String = row.try_get("DEFINER").unwrap_or_default();
    let definition: Option<String> = row.try_get("ROUTINE_DEFINITION").ok();

    let metadata = RoutineMetadata {
        definer,
        routine_name,
        return_type: return_type.unwrap_or_default(),
        definition: definition.unwrap_or_default(),
        is_deterministic,
        security_type,
    };

    let parameters = routine_parameters(catalog, name, db_name, kind).await?;

    Ok((metadata, parameters))
}

/// Fetches the routine's parameters in ordinal order, each with its derived
/// full type: character types get a length suffix, decimal/float types a
/// precision/scale suffix, everything else the bare type name.
async fn routine_parameters(
    catalog: &MySqlCatalog,
    name: &str,
    db_name: &str,
    kind: ObjectKind,
) -> Result<Vec<Parameter>> {
    let params_query = r#"
        SELECT
            CAST(PARAMETER_NAME AS CHAR) AS PARAMETER_NAME,
            CONCAT(
                DATA_TYPE,
                CASE
                    WHEN DATA_TYPE IN ('char', 'varchar', 'binary', 'varbinary')
                        THEN CONCAT('(', CHARACTER_MAXIMUM_LENGTH, ')')
                    WHEN DATA_TYPE IN ('decimal', 'numeric', 'float', 'double')
                        THEN CONCAT('(', NUMERIC_PRECISION, ',', NUMERIC_SCALE, ')')
                    ELSE ''
                END
            ) AS FULL_TYPE,
            CAST(PARAMETER_MODE AS CHAR) AS PARAMETER_MODE
        FROM INFORMATION_SCHEMA.PARAMETERS
        WHERE SPECIFIC_NAME = ?
          AND SPECIFIC_SCHEMA = ?
          AND ROUTINE_TYPE = ?
        ORDER BY ORDINAL_POSITION
    "#;
    catalog.record_history(params_query, db_name);

    let rows = sqlx::query(params_query)
        .bind(name)
        .bind(db_name)
        .bind(kind.as_str())
        .fetch_all(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to fetch parameters for routine '{}'", name),
                e,
            )
        })?;

    let mut parameters = Vec::with_capacity(rows.len());
    for row in &rows {
        // Name and mode are NULL on function return rows: valid-but-absent.
        let param_name: Option<String> = row.try_get("PARAMETER_NAME").ok().flatten();
        let full_type: Option<String> = row.try_get("FULL_TYPE").ok().flatten();
        let param_mode: Option<String> = row.try_get("PARAMETER_MODE").ok().flatten();

        parameters.push(Parameter {
            name: param_name.unwrap_or_default(),
            data_type: full_type.unwrap_or_default(),
            mode: ParameterMode::from_catalog(param_mode.as_deref()),
        });
    }

    Ok(parameters)
}

/// Resolves the full return type of a routine.
///
/// Determines the routine kind first; for a FUNCTION the type comes off the
/// routine row, for a PROCEDURE it is the first OUT-mode parameter by
/// ordinal position. Any other kind is unsupported.
pub(crate) async fn full_return_type(
    catalog: &MySqlCatalog,
    name: &str,
    db_name: &str,
) -> Result<String> {
    let type_query = r#"
        SELECT CAST(ROUTINE_TYPE AS CHAR)
        FROM INFORMATION_SCHEMA.ROUTINES
        WHERE ROUTINE_NAME = ?
          AND ROUTINE_SCHEMA = ?
    "#;
    catalog.record_history(type_query, db_name);

    let routine_type: Option<String> = sqlx::query_scalar(type_query)
        .bind(name)
        .bind(db_name)
        .fetch_optional(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to fetch routine type for '{}'", name),
                e,
            )
        })?;

    let Some(routine_type) = routine_type else {
        return Err(crate::error::SchemaDumpError::RoutineNotFound {
            name: name.to_string(),
        });
    };

    let query = match routine_type.as_str() {
        "FUNCTION" => {
            r#"
            SELECT
                CAST(DATA_TYPE AS CHAR) AS DATA_TYPE,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS CHARACTER_MAXIMUM_LENGTH,
                CAST(NUMERIC_PRECISION AS SIGNED) AS NUMERIC_PRECISION,
                CAST(NUMERIC_SCALE AS SIGNED) AS NUMERIC_SCALE
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_NAME = ?
              AND ROUTINE_SCHEMA = ?
            "#
        }
        "PROCEDURE" => {
            r#"
            SELECT
                CAST(DATA_TYPE AS CHAR) AS DATA_TYPE,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS CHARACTER_MAXIMUM_LENGTH,
                CAST(NUMERIC_PRECISION AS SIGNED) AS NUMERIC_PRECISION,
                CAST(NUMERIC_SCALE AS SIGNED) AS NUMERIC_SCALE
            FROM INFORMATION_SCHEMA.PARAMETERS
            WHERE SPECIFIC_NAME = ?
              AND SPECIFIC_SCHEMA = ?
              AND PARAMETER_MODE = 'OUT'
            ORDER BY ORDINAL_POSITION
            LIMIT 1
            "#
        }
        other => {
            return Err(crate::error::SchemaDumpError::UnsupportedRoutineKind {
                kind: other.to_string(),
            });
        }
    };
    catalog.record_history(query, db_name);

    let row = sqlx::query(query)
        .bind(name)
        .bind(db_name)
        .fetch_optional(&catalog.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed(
                format!("Failed to fetch return type for '{}'", name),
                e,
            )
        })?;

    let Some(row) = row else {
        return Err(crate::error::SchemaDumpError::MissingReturnType {
            name: name.to_string(),
        });
    };

    let data_type: String = row.try_get("DATA_TYPE").unwrap_or_default();
    let char_length: Option<i64> = row.try_get("CHARACTER_MAXIMUM_LENGTH").ok().flatten();
    let precision: Option<i64> = row.try_get("NUMERIC_PRECISION").ok().flatten();
    let scale: Option<i64> = row.try_get("NUMERIC_SCALE").ok().flatten();

    Ok(compose_return_type(&data_type, char_length, precision, scale))
}

/// Builds the full type string for a return type: only character types get
/// a length suffix and only decimal/numeric get precision/scale.
fn compose_return_type(
    data_type: &str,
    char_length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) -> String {
    match data_type {
        "varchar" | "char" => match char_length {
            Some(len) => format!("{}({})", data_type, len),
            None => data_type.to_string(),
        },
        "decimal" | "numeric" => match (precision, scale) {
            (Some(p), Some(s)) => format!("{}({},{})", data_type, p, s),
            _ => data_type.to_string(),
        },
        _ => data_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_type_character_suffix() {
        assert_eq!(
            compose_return_type("varchar", Some(100), None, None),
            "varchar(100)"
        );
        assert_eq!(compose_return_type("char", None, None, None), "char");
    }

    #[test]
    fn return_type_numeric_suffix() {
        assert_eq!(
            compose_return_type("decimal", None, Some(10), Some(2)),
            "decimal(10,2)"
        );
        assert_eq!(
            compose_return_type("numeric", None, Some(8), None),
            "numeric"
        );
    }

    #[test]
    fn return_type_bare_for_other_kinds() {
        assert_eq!(compose_return_type("int", None, Some(10), Some(0)), "int");
        assert_eq!(
            compose_return_type("datetime", Some(19), None, None),
            "datetime"
        );
    }
}
