//! Query-history sink seam.
//!
//! The catalog records the text of every statement it executes through this
//! trait. Recording is fire-and-forget: implementations must swallow their
//! own failures, and callers never observe them.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Recorder of executed statement text.
pub trait HistorySink: Send + Sync {
    /// Records one executed statement against the database it ran in.
    fn record(&self, statement: &str, database: &str);
}

/// Discards everything. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl HistorySink for NoopHistory {
    fn record(&self, _statement: &str, _database: &str) {}
}

/// Appends statements to a local file, one timestamped line per record.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }
}

impl HistorySink for FileHistory {
    fn record(&self, statement: &str, database: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if guard.is_none() {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
            {
                Ok(f) => *guard = Some(f),
                Err(e) => {
                    tracing::debug!("failed to open history file {}: {}", self.path.display(), e);
                    return;
                }
            }
        }
        if let Some(file) = guard.as_mut() {
            let line = format!(
                "{} [{}] {}\n",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
                database,
                statement.replace('\n', " "),
            );
            if let Err(e) = file.write_all(line.as_bytes()) {
                tracing::debug!("failed to record query history: {}", e);
                *guard = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_history_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.log");
        let sink = FileHistory::new(&path);

        sink.record("SELECT 1", "sales");
        sink.record("SHOW DATABASES", "sales");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[sales] SELECT 1"));
        assert!(lines[1].contains("SHOW DATABASES"));
    }

    #[test]
    fn file_history_flattens_multiline_statements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.log");
        let sink = FileHistory::new(&path);

        sink.record("SELECT name\nFROM t", "db");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("SELECT name FROM t"));
    }

    #[test]
    fn file_history_swallows_open_failure() {
        // Directory path cannot be opened as a file; record must not panic.
        let dir = tempfile::tempdir().unwrap();
        let sink = FileHistory::new(dir.path());
        sink.record("SELECT 1", "db");
    }
}
