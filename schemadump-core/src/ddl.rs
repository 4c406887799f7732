//! Routine DDL reconstruction.
//!
//! The catalog does not expose a ready-made `CREATE FUNCTION` /
//! `CREATE PROCEDURE` statement the way it does for tables and views, so
//! these builders synthesize one from the fragments the catalog does have:
//! definer, parameter list, return-type pieces, security attributes, and
//! the body text. The output is a single complete statement ending in the
//! routine body; statement termination is the caller's decision, so no
//! semicolon is appended here.

use crate::Result;
use crate::catalog::MySqlCatalog;
use crate::models::{ObjectKind, Parameter, ParameterMode, RoutineMetadata};

/// Splits a definer into user and host on the first `@`.
///
/// An absent host yields an empty string.
fn split_definer(definer: &str) -> (&str, &str) {
    match definer.split_once('@') {
        Some((user, host)) => (user, host),
        None => (definer, ""),
    }
}

/// Builds a `CREATE FUNCTION` statement from fetched metadata.
///
/// Parameters whose mode is unspecified are dropped from the signature
/// unless `include_unmoded_params` is set. Function parameters usually
/// carry no mode in the catalog, so the default filter can erase every
/// parameter; the flag turns the legacy filtering off. The trailing-comma
/// trim fires whenever the fetched parameter list was non-empty, emitted
/// or not.
pub fn function_ddl(
    metadata: &RoutineMetadata,
    params: &[Parameter],
    return_type: &str,
    include_unmoded_params: bool,
) -> String {
    let (user, host) = split_definer(&metadata.definer);

    let mut stmt = format!(
        "CREATE DEFINER=`{}`@`{}` FUNCTION `{}` (\n",
        user, host, metadata.routine_name
    );

    for param in params {
        if include_unmoded_params || param.mode != ParameterMode::Unspecified {
            stmt.push_str(&format!("    `{}` {},\n", param.name, param.data_type));
        }
    }
    if !params.is_empty() {
        stmt.truncate(stmt.len() - 2);
        stmt.push('\n');
    }

    stmt.push_str(&format!(") RETURNS {}\n", return_type));
    stmt.push_str("LANGUAGE SQL\n");
    stmt.push_str("DETERMINISTIC\n");
    stmt.push_str("CONTAINS SQL\n");
    stmt.push_str(&format!("SQL SECURITY {}\n", metadata.security_type));
    stmt.push_str("COMMENT ''\n");
    stmt.push_str(&metadata.definition);
    stmt.push('\n');

    stmt
}

/// Builds a `CREATE PROCEDURE` statement from fetched metadata.
///
/// Every parameter is emitted; a missing mode defaults to `IN`.
pub fn procedure_ddl(metadata: &RoutineMetadata, params: &[Parameter]) -> String {
    let (user, host) = split_definer(&metadata.definer);

    let mut stmt = format!(
        "CREATE DEFINER=`{}`@`{}` PROCEDURE `{}` (\n",
        user, host, metadata.routine_name
    );

    for param in params {
        let mode = match param.mode {
            ParameterMode::Unspecified => "IN",
            other => other.as_keyword(),
        };
        stmt.push_str(&format!(
            "    {} `{}` {},\n",
            mode, param.name, param.data_type
        ));
    }
    if !params.is_empty() {
        stmt.truncate(stmt.len() - 2);
        stmt.push('\n');
    }

    stmt.push_str(")\n");
    stmt.push_str("LANGUAGE SQL\n");
    stmt.push_str("DETERMINISTIC\n");
    stmt.push_str("CONTAINS SQL\n");
    stmt.push_str(&format!("SQL SECURITY {}\n", metadata.security_type));
    stmt.push_str("COMMENT ''\n");
    stmt.push_str(&metadata.definition);
    stmt.push('\n');

    stmt
}

/// Fetches a routine's fragments from the catalog and reconstructs its
/// definition statement.
///
/// Return-type resolution failures propagate as typed errors; error text is
/// never embedded in the generated SQL.
pub async fn reconstruct_routine(
    catalog: &MySqlCatalog,
    name: &str,
    db_name: &str,
    kind: ObjectKind,
    include_unmoded_params: bool,
) -> Result<String> {
    let (metadata, params) = catalog.routine_metadata(name, db_name, kind).await?;

    match kind {
        ObjectKind::Function => {
            let return_type = catalog
                .full_return_type(&metadata.routine_name, db_name)
                .await?;
            Ok(function_ddl(
                &metadata,
                &params,
                &return_type,
                include_unmoded_params,
            ))
        }
        ObjectKind::Procedure => Ok(procedure_ddl(&metadata, &params)),
        other => Err(crate::error::SchemaDumpError::UnsupportedRoutineKind {
            kind: other.as_str().to_string(),
        }),
    }
}
