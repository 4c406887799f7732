//! Core engine for schemadump.
//!
//! This crate implements the two subsystems behind the CLI:
//!
//! - **Routine DDL reconstruction** — the catalog exposes stored functions
//!   and procedures only as fragments (attributes, parameter rows, body
//!   text), so [`ddl`] synthesizes executable `CREATE` statements from what
//!   [`catalog`] fetches.
//! - **Concurrent export** — [`export`] writes a whole database to five
//!   segregated, gzip-compressed SQL script streams using a bounded worker
//!   pool, reporting progress over a channel the caller consumes until it
//!   closes.
//!
//! All database operations are read-only (SELECT/SHOW only) and connection
//! strings are sanitized before they can reach an error message or log
//! line.

pub mod catalog;
pub mod ddl;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod models;
pub mod values;

// Re-export commonly used types
pub use catalog::{CatalogConfig, MySqlCatalog};
pub use error::{Result, SchemaDumpError};
pub use export::progress::{ProgressEvent, Severity};
pub use export::{ExportOptions, Exporter};
pub use history::{FileHistory, HistorySink, NoopHistory};
pub use logging::init_logging;
pub use models::{
    ObjectKind, Parameter, ParameterMode, RoutineMetadata, SchemaObject, sort_for_export,
};
