//! SQL literal rendering for exported row data.
//!
//! Exported scripts carry their data inline as INSERT statements, with no
//! parameterized binding, so the safety of the generated file rests
//! entirely on [`escape_literal`] being applied to every scanned value.

use crate::Result;
use bigdecimal::BigDecimal;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Escapes a string for use inside a single-quoted SQL literal.
///
/// Single quotes are doubled; newlines, carriage returns, and tabs are
/// removed outright so every literal stays on one line. The caller adds the
/// surrounding quotes.
pub fn escape_literal(input: &str) -> String {
    input
        .replace('\'', "''")
        .replace(['\n', '\r', '\t'], "")
}

/// Quotes an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// One column value decoded from a result row, ready for literal rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Renders the value as SQL literal text.
    ///
    /// `NULL` is the only unquoted form; every other value is emitted as a
    /// quoted, escaped literal so the output matches line-for-line across
    /// numeric and textual columns.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => format!("'{}'", v),
            Self::Unsigned(v) => format!("'{}'", v),
            Self::Float(v) => format!("'{}'", v),
            Self::Text(v) => format!("'{}'", escape_literal(v)),
            Self::Bytes(v) => format!("'{}'", escape_literal(&String::from_utf8_lossy(v))),
        }
    }
}

/// Decodes one column of a result row into a [`SqlValue`].
///
/// Dispatches on the column's MySQL type name; types without a dedicated
/// arm fall back to text, then to raw bytes.
pub fn decode_column(row: &MySqlRow, index: usize) -> Result<SqlValue> {
    let column = &row.columns()[index];
    let type_name = column.type_info().name().to_uppercase();

    let raw = row.try_get_raw(index).map_err(|e| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to read column '{}'", column.name()),
            e,
        )
    })?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let decode_err = |e: sqlx::Error| {
        crate::error::SchemaDumpError::catalog_failed(
            format!("Failed to decode column '{}' ({})", column.name(), type_name),
            e,
        )
    };

    let value = match type_name.as_str() {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            SqlValue::Integer(row.try_get::<i64, _>(index).map_err(decode_err)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            SqlValue::Unsigned(row.try_get::<u64, _>(index).map_err(decode_err)?)
        }
        "YEAR" => SqlValue::Unsigned(u64::from(
            row.try_get::<u16, _>(index).map_err(decode_err)?,
        )),
        "BIT" => SqlValue::Unsigned(row.try_get::<u64, _>(index).map_err(decode_err)?),
        "BOOLEAN" => SqlValue::Integer(i64::from(
            row.try_get::<bool, _>(index).map_err(decode_err)?,
        )),
        "FLOAT" => SqlValue::Float(f64::from(
            row.try_get::<f32, _>(index).map_err(decode_err)?,
        )),
        "DOUBLE" => SqlValue::Float(row.try_get::<f64, _>(index).map_err(decode_err)?),
        "DECIMAL" => SqlValue::Text(
            row.try_get::<BigDecimal, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "DATE" => SqlValue::Text(
            row.try_get::<chrono::NaiveDate, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "DATETIME" | "TIMESTAMP" => SqlValue::Text(
            row.try_get::<chrono::NaiveDateTime, _>(index)
                .map_err(decode_err)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "TIME" => SqlValue::Text(
            row.try_get::<chrono::NaiveTime, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlValue::Bytes(row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?)
        }
        // CHAR/VARCHAR/TEXT/ENUM/SET/JSON and anything unrecognized:
        // text first, raw bytes as the last resort.
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => SqlValue::Text(text),
            Err(_) => SqlValue::Bytes(row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?),
        },
    };

    Ok(value)
}
