//! Data models for schema objects and routine metadata.
//!
//! These are the shapes shared between the catalog reader, the DDL
//! reconstructor, and the export engine. A [`SchemaObject`] list is an
//! immutable snapshot: it is taken once per database selection and passed
//! by value into the exporter, never held in shared mutable state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a schema object as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
}

impl ObjectKind {
    /// Catalog spelling of the kind (`"TABLE"`, `"VIEW"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
        }
    }

    /// Fixed display/export ordering: TABLE < VIEW < FUNCTION < PROCEDURE.
    ///
    /// Export correctness does not depend on this ordering (objects are
    /// independent), but the mapping must stay stable for display parity.
    pub fn priority(self) -> u8 {
        match self {
            Self::Table => 0,
            Self::View => 1,
            Self::Function => 2,
            Self::Procedure => 3,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = crate::error::SchemaDumpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "TABLE" => Ok(Self::Table),
            "VIEW" => Ok(Self::View),
            "PROCEDURE" => Ok(Self::Procedure),
            "FUNCTION" => Ok(Self::Function),
            other => Err(crate::error::SchemaDumpError::UnsupportedRoutineKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// One named schema object, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub name: String,
    pub kind: ObjectKind,
}

impl SchemaObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Stable sort of a snapshot by kind priority.
///
/// Within a kind the catalog order is preserved.
pub fn sort_for_export(objects: &mut [SchemaObject]) {
    objects.sort_by_key(|o| o.kind.priority());
}

/// Parameter mode of a stored routine argument.
///
/// The catalog legitimately reports NULL for ordinary function parameters
/// (mode applies mainly to procedures), so absence is a value here, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    #[default]
    Unspecified,
}

impl ParameterMode {
    /// Parses a catalog mode string; `None` or unknown text maps to
    /// `Unspecified`.
    pub fn from_catalog(mode: Option<&str>) -> Self {
        match mode {
            Some("IN") => Self::In,
            Some("OUT") => Self::Out,
            Some("INOUT") => Self::InOut,
            _ => Self::Unspecified,
        }
    }

    /// Keyword used in a reconstructed signature, empty when unspecified.
    pub fn as_keyword(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
            Self::Unspecified => "",
        }
    }
}

/// One routine parameter with its derived full type (length/precision
/// suffix already applied).
///
/// Parameters are kept in catalog ordinal order; that ordering is the call
/// signature and must never be re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// May be empty: function return rows carry a NULL parameter name.
    pub name: String,
    pub data_type: String,
    pub mode: ParameterMode,
}

/// Routine-level attributes fetched from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineMetadata {
    /// Authoring identity in `user@host` form; the host part may be absent.
    pub definer: String,
    pub routine_name: String,
    /// Bare return data type as reported on the routine row.
    pub return_type: String,
    /// Routine body text, reproduced verbatim in reconstructed DDL.
    pub definition: String,
    pub is_deterministic: String,
    /// `DEFINER` or `INVOKER`, emitted into the `SQL SECURITY` clause.
    pub security_type: String,
}
