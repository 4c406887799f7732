//! Concurrent MySQL schema and data export tool.
//!
//! Connects to a MySQL server, enumerates the schema objects of one
//! database, and exports them to five gzip-compressed, replayable SQL
//! scripts. Progress is streamed to the terminal as the worker pool runs.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use schemadump_core::{
    ExportOptions, Exporter, FileHistory, MySqlCatalog, NoopHistory, ObjectKind, Severity,
    ddl::reconstruct_routine, init_logging, sort_for_export,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "schemadump")]
#[command(about = "MySQL schema and data export tool")]
#[command(version)]
#[command(long_about = "
schemadump - concurrent MySQL database export

Exports one database to five compressed SQL script files:
  <prefix>_table.gz      table DDL and batched INSERT data
  <prefix>_view.gz       view definitions behind DROP guards
  <prefix>_viewddl.gz    placeholder structures for views
  <prefix>_procedure.gz  stored procedures in DELIMITER guards
  <prefix>_function.gz   stored functions in DELIMITER guards

The connection URL is read from the DATABASE_URL environment variable or
from a file via --database-url-file; it is never taken as a bare argument,
so credentials stay out of the process list.

EXAMPLES:
  DATABASE_URL=mysql://root:pw@localhost schemadump export -d sales -o backup
  schemadump list-objects --database sales
  schemadump test-connection
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase log verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a file containing the database URL
    #[arg(long, value_name = "FILE", global = true)]
    database_url_file: Option<PathBuf>,

    /// Record executed catalog statements to this file
    #[arg(long, value_name = "FILE", global = true)]
    history_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Export a database to compressed SQL scripts
    Export {
        /// Database to export
        #[arg(short, long)]
        database: String,

        /// Output file prefix (five <prefix>_*.gz files are written)
        #[arg(short, long)]
        output: String,

        /// Size of the worker pool
        #[arg(long, default_value_t = 10)]
        workers: usize,

        /// Row tuples per INSERT statement
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },

    /// List the exportable objects of a database
    ListObjects {
        /// Database to inspect
        #[arg(short, long)]
        database: String,

        /// Emit the object list as JSON
        #[arg(long)]
        json: bool,
    },

    /// List databases visible to the connected account
    ListDatabases,

    /// Reconstruct the CREATE statement of a stored routine
    ShowRoutine {
        /// Database the routine lives in
        #[arg(short, long)]
        database: String,

        /// Routine name
        #[arg(short, long)]
        name: String,

        /// FUNCTION or PROCEDURE
        #[arg(short, long)]
        kind: String,

        /// Emit function parameters whose catalog mode is empty
        #[arg(long)]
        include_unmoded_params: bool,
    },

    /// Test connectivity and catalog access
    TestConnection,
}

/// Resolves the database URL from the environment or a file.
fn get_database_url(database_url_file: Option<&PathBuf>) -> anyhow::Result<String> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if url.starts_with("mysql://") {
            return Ok(url);
        }
        bail!("DATABASE_URL must use the mysql:// scheme");
    }

    if let Some(path) = database_url_file {
        let url = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read database URL file {}", path.display()))?;
        let url = url.trim();
        if url.starts_with("mysql://") {
            return Ok(url.to_string());
        }
        bail!(
            "Database URL in {} must use the mysql:// scheme",
            path.display()
        );
    }

    bail!("No database URL found: set DATABASE_URL or pass --database-url-file")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let database_url = get_database_url(cli.global.database_url_file.as_ref())?;
    let history: Arc<dyn schemadump_core::HistorySink> = match &cli.global.history_file {
        Some(path) => Arc::new(FileHistory::new(path)),
        None => Arc::new(NoopHistory),
    };
    let catalog = MySqlCatalog::with_history(&database_url, history)
        .await
        .context("Failed to create catalog handle")?;

    match cli.command {
        Command::Export {
            database,
            output,
            workers,
            batch_size,
        } => {
            let objects = catalog
                .list_objects(&database)
                .await
                .context("Failed to enumerate schema objects")?;
            info!("Exporting {} objects from '{}'", objects.len(), database);

            let options = ExportOptions {
                workers,
                batch_size,
                ..ExportOptions::default()
            };
            let exporter = Exporter::new(&catalog, &database, options)
                .context("Failed to prepare export")?;

            let mut progress = exporter.start(output, objects);
            let mut fatal = false;
            while let Some(event) = progress.recv().await {
                println!("{}", event);
                if event.severity == Severity::Error {
                    fatal = true;
                }
            }

            catalog.close().await;
            if fatal {
                bail!("Export aborted");
            }
        }

        Command::ListObjects { database, json } => {
            let mut objects = catalog
                .list_objects(&database)
                .await
                .context("Failed to enumerate schema objects")?;
            sort_for_export(&mut objects);

            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                for object in &objects {
                    println!("{} {}", object.kind, object.name);
                }
                println!("{} objects in '{}'", objects.len(), database);
            }
            catalog.close().await;
        }

        Command::ListDatabases => {
            let databases = catalog
                .list_databases()
                .await
                .context("Failed to enumerate databases")?;
            for database in &databases {
                println!("{}", database);
            }
            catalog.close().await;
        }

        Command::ShowRoutine {
            database,
            name,
            kind,
            include_unmoded_params,
        } => {
            let kind: ObjectKind = kind
                .to_uppercase()
                .parse()
                .context("Kind must be FUNCTION or PROCEDURE")?;
            let statement =
                reconstruct_routine(&catalog, &name, &database, kind, include_unmoded_params)
                    .await
                    .context("Failed to reconstruct routine definition")?;
            println!("{}", statement);
            catalog.close().await;
        }

        Command::TestConnection => {
            catalog
                .test_connection()
                .await
                .context("Connection test failed")?;
            println!("Connection successful");
            catalog.close().await;
        }
    }

    Ok(())
}
