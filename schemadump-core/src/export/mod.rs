//! Concurrent full-database export.
//!
//! # Module Structure
//! - `progress`: Progress events consumed by the caller
//! - `sink`: The five compressed output streams
//! - `batch`: Multi-row INSERT accumulation
//! - `worker`: Per-object processing
//!
//! The export is asynchronous and non-blocking to the caller: it returns a
//! progress-event receiver immediately and the run finishes when the
//! receiver closes. An immutable snapshot of the target objects is passed
//! in at call time; the exporter never reads shared mutable state.

pub mod batch;
pub mod progress;
pub mod sink;
pub mod worker;

use crate::Result;
use crate::catalog::{MySqlCatalog, connection};
use crate::models::{SchemaObject, sort_for_export};
use progress::ProgressEvent;
use sink::SinkSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Tunables for one export run, validated at construction time.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Fixed size of the worker pool.
    pub workers: usize,
    /// Row tuples accumulated per INSERT statement.
    pub batch_size: usize,
    /// Pause after each finished task. A throttle, not a correctness knob.
    pub throttle: Duration,
    /// Liveness probe attempts before each task.
    pub liveness_retries: u32,
    /// Pause between failed liveness probes.
    pub liveness_backoff: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            batch_size: 1000,
            throttle: Duration::from_millis(50),
            liveness_retries: 3,
            liveness_backoff: Duration::from_secs(2),
        }
    }
}

impl ExportOptions {
    /// Validates the options; worker count and batch size must be at
    /// least 1.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(crate::error::SchemaDumpError::configuration(
                "worker count must be at least 1",
            ));
        }
        if self.batch_size == 0 {
            return Err(crate::error::SchemaDumpError::configuration(
                "batch size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Full-database export to five compressed SQL script streams.
#[derive(Debug)]
pub struct Exporter {
    connection_url: String,
    db_name: String,
    options: ExportOptions,
}

impl Exporter {
    /// Prepares an export of `db_name`, reusing the catalog's credentials
    /// for a dedicated connection pool.
    ///
    /// # Errors
    /// Returns error if the options fail validation or the database name
    /// cannot form a connection URL.
    pub fn new(catalog: &MySqlCatalog, db_name: &str, options: ExportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            connection_url: catalog.connection_url_for_database(db_name)?,
            db_name: db_name.to_string(),
            options,
        })
    }

    /// Starts the export over the given object snapshot.
    ///
    /// Returns immediately with the progress-event stream; the stream
    /// closing is the terminal state of the run. Setup failures (pool or
    /// any output stream) produce a single error event and an immediately
    /// closed stream.
    pub fn start(
        self,
        output_prefix: impl Into<String>,
        objects: Vec<SchemaObject>,
    ) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_export(
            self.connection_url,
            self.db_name,
            self.options,
            output_prefix.into(),
            objects,
            progress_tx,
        ));
        progress_rx
    }
}

async fn run_export(
    connection_url: String,
    db_name: String,
    options: ExportOptions,
    output_prefix: String,
    mut objects: Vec<SchemaObject>,
    progress: mpsc::UnboundedSender<ProgressEvent>,
) {
    // Dedicated pool so a long export cannot starve interactive use of the
    // caller's pool, bounded to stay under server connection limits.
    let pool = match open_export_pool(&connection_url).await {
        Ok(pool) => pool,
        Err(e) => {
            let _ = progress.send(ProgressEvent::error(format!(
                "Failed to connect to DB: {}",
                e
            )));
            return;
        }
    };

    let sinks = match SinkSet::open(&output_prefix) {
        Ok(sinks) => Arc::new(sinks),
        Err(e) => {
            let _ = progress.send(ProgressEvent::error(e.to_string()));
            pool.close().await;
            return;
        }
    };

    sort_for_export(&mut objects);
    let total = objects.len();
    tracing::info!("Exporting {} objects from '{}'", total, db_name);

    // Bounded queue sized to the snapshot; every enqueue is non-blocking.
    let (task_tx, task_rx) = mpsc::channel(total.max(1));
    for object in objects {
        if task_tx.try_send(object).is_err() {
            break;
        }
    }
    drop(task_tx);
    let task_rx = Arc::new(tokio::sync::Mutex::new(task_rx));

    let mut handles = Vec::with_capacity(options.workers);
    for _ in 0..options.workers {
        let pool = pool.clone();
        let sinks = Arc::clone(&sinks);
        let task_rx = Arc::clone(&task_rx);
        let progress = progress.clone();
        let options = options.clone();

        handles.push(tokio::spawn(async move {
            loop {
                // Single ownership: each object is dequeued exactly once.
                let object = { task_rx.lock().await.recv().await };
                let Some(object) = object else {
                    break;
                };

                worker::wait_until_live(&pool, options.liveness_retries, options.liveness_backoff)
                    .await;

                match worker::process_object(&pool, &sinks, &options, &object).await {
                    Ok(()) => {
                        let _ = progress.send(ProgressEvent::info(format!(
                            "Exported {}: {}",
                            object.kind, object.name
                        )));
                    }
                    Err(e) => {
                        let _ = progress.send(ProgressEvent::warn(format!(
                            "Failed to export {}: {} - {}",
                            object.kind, object.name, e
                        )));
                    }
                }

                tokio::time::sleep(options.throttle).await;
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    // All worker clones are gone once the pool has joined; the sinks are
    // flushed and closed exactly once.
    match Arc::try_unwrap(sinks) {
        Ok(sinks) => {
            if let Err(e) = sinks.finish() {
                let _ = progress.send(ProgressEvent::error(format!(
                    "Failed to finalize output streams: {}",
                    e
                )));
                pool.close().await;
                return;
            }
        }
        Err(_) => {
            let _ = progress.send(ProgressEvent::error(
                "Output streams still in use after workers finished".to_string(),
            ));
            pool.close().await;
            return;
        }
    }

    let _ = progress.send(ProgressEvent::info(format!(
        "Export complete: {} objects from '{}'",
        total, db_name
    )));
    pool.close().await;
}

/// Opens the export's dedicated pool and verifies it is usable.
async fn open_export_pool(connection_url: &str) -> Result<sqlx::MySqlPool> {
    let config = connection::parse_connection_config(connection_url)?;
    let pool = connection::create_connection_pool(connection_url, &config).await?;

    // The pool connects lazily; force one round-trip so setup failures are
    // fatal here rather than per-object warnings later.
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(crate::error::SchemaDumpError::connection_failed)?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let options = ExportOptions::default();
        assert_eq!(options.workers, 10);
        assert_eq!(options.batch_size, 1000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let options = ExportOptions {
            workers: 0,
            ..ExportOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let options = ExportOptions {
            batch_size: 0,
            ..ExportOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
