//! Compressed SQL output sinks.
//!
//! An export writes to five segregated streams, one per statement family.
//! Each sink layers a buffered writer over a gzip encoder over the backing
//! file and serializes access behind its own lock, so up to `workers`
//! concurrent producers can never interleave the bytes of two statements
//! in one file. Statements must be composed as complete strings before
//! they reach a sink.

use crate::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;

/// One compressed, lock-guarded SQL statement stream.
pub struct SqlSink {
    label: &'static str,
    writer: Mutex<BufWriter<GzEncoder<File>>>,
}

impl std::fmt::Debug for SqlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSink")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl SqlSink {
    /// Creates `<prefix>_<suffix>.gz` and wraps it for buffered compressed
    /// writing.
    fn create(prefix: &str, suffix: &'static str) -> Result<Self> {
        let path = format!("{}_{}.gz", prefix, suffix);
        let file = File::create(&path).map_err(|e| {
            crate::error::SchemaDumpError::io(format!("Failed to open {} file", suffix), e)
        })?;
        let encoder = GzEncoder::new(file, Compression::default());
        Ok(Self {
            label: suffix,
            writer: Mutex::new(BufWriter::new(encoder)),
        })
    }

    /// Writes one complete statement under the sink's lock.
    pub fn write_statement(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| {
            crate::error::SchemaDumpError::configuration(format!(
                "{} sink lock poisoned",
                self.label
            ))
        })?;
        writer.write_all(text.as_bytes()).map_err(|e| {
            crate::error::SchemaDumpError::io(format!("Failed to write {} stream", self.label), e)
        })
    }

    /// Writes one complete statement and flushes the buffer through to the
    /// compressor.
    pub fn write_statement_flush(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| {
            crate::error::SchemaDumpError::configuration(format!(
                "{} sink lock poisoned",
                self.label
            ))
        })?;
        writer.write_all(text.as_bytes()).map_err(|e| {
            crate::error::SchemaDumpError::io(format!("Failed to write {} stream", self.label), e)
        })?;
        writer.flush().map_err(|e| {
            crate::error::SchemaDumpError::io(format!("Failed to flush {} stream", self.label), e)
        })
    }

    /// Flushes and finalizes the gzip stream. Called exactly once, after
    /// all producers have stopped.
    fn finish(self) -> Result<()> {
        let writer = self.writer.into_inner().map_err(|_| {
            crate::error::SchemaDumpError::configuration(format!(
                "{} sink lock poisoned",
                self.label
            ))
        })?;
        let encoder = writer.into_inner().map_err(|e| {
            crate::error::SchemaDumpError::io(
                format!("Failed to flush {} stream", self.label),
                e.into_error(),
            )
        })?;
        encoder.finish().map_err(|e| {
            crate::error::SchemaDumpError::io(format!("Failed to finalize {} stream", self.label), e)
        })?;
        Ok(())
    }
}

/// The five output streams of one export run.
///
/// Opening is all-or-nothing: a single failed stream aborts the export
/// before any worker starts.
#[derive(Debug)]
pub struct SinkSet {
    pub table: SqlSink,
    pub view: SqlSink,
    pub viewddl: SqlSink,
    pub procedure: SqlSink,
    pub function: SqlSink,
}

impl SinkSet {
    /// Opens all five streams under the given output prefix.
    pub fn open(prefix: &str) -> Result<Self> {
        Ok(Self {
            table: SqlSink::create(prefix, "table")?,
            view: SqlSink::create(prefix, "view")?,
            viewddl: SqlSink::create(prefix, "viewddl")?,
            procedure: SqlSink::create(prefix, "procedure")?,
            function: SqlSink::create(prefix, "function")?,
        })
    }

    /// Flushes and closes every stream exactly once.
    pub fn finish(self) -> Result<()> {
        self.table.finish()?;
        self.view.finish()?;
        self.viewddl.finish()?;
        self.procedure.finish()?;
        self.function.finish()?;
        Ok(())
    }
}

/// Section banner preceding each object in a stream.
pub fn banner(kind: &str, name: &str) -> String {
    format!(
        "-- ----------------------------\n-- {}: {}\n-- ----------------------------\n",
        kind, name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn read_gz(path: &std::path::Path) -> String {
        let mut decoder = GzDecoder::new(File::open(path).unwrap());
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn writes_round_trip_through_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("dump").to_string_lossy().into_owned();

        let sinks = SinkSet::open(&prefix).unwrap();
        sinks
            .table
            .write_statement("CREATE TABLE `t` (`id` INT);\n")
            .unwrap();
        sinks
            .view
            .write_statement_flush("DROP TABLE IF EXISTS `v`;\n")
            .unwrap();
        sinks.finish().unwrap();

        let table = read_gz(&dir.path().join("dump_table.gz"));
        assert_eq!(table, "CREATE TABLE `t` (`id` INT);\n");

        let view = read_gz(&dir.path().join("dump_view.gz"));
        assert_eq!(view, "DROP TABLE IF EXISTS `v`;\n");
    }

    #[test]
    fn open_creates_all_five_files() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("backup").to_string_lossy().into_owned();

        let sinks = SinkSet::open(&prefix).unwrap();
        sinks.finish().unwrap();

        for suffix in ["table", "view", "viewddl", "procedure", "function"] {
            assert!(
                dir.path().join(format!("backup_{}.gz", suffix)).exists(),
                "missing {} stream",
                suffix
            );
        }
    }

    #[test]
    fn open_fails_for_unwritable_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir
            .path()
            .join("missing-subdir")
            .join("dump")
            .to_string_lossy()
            .into_owned();

        assert!(SinkSet::open(&prefix).is_err());
    }

    #[test]
    fn banner_names_the_object() {
        let text = banner("TABLE", "orders");
        assert!(text.starts_with("-- ----------------------------\n"));
        assert!(text.contains("-- TABLE: orders\n"));
    }
}
