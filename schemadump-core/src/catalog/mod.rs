//! MySQL catalog reader with connection pooling.
//!
//! # Module Structure
//! - `connection`: Connection pool management and URL validation
//! - `objects`: Database and schema-object enumeration
//! - `routines`: Routine metadata, parameters, and return-type resolution
//!
//! All operations are read-only (SELECT/SHOW only) and connection strings
//! are sanitized in error messages.

pub mod connection;
pub mod objects;
pub mod routines;

use crate::Result;
use crate::history::{HistorySink, NoopHistory};
use crate::models::{Parameter, RoutineMetadata, SchemaObject};
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

/// Connection configuration for a catalog handle.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    /// Maximum open connections in the pool.
    pub max_connections: u32,
    /// Idle connections kept warm.
    pub min_idle_connections: u32,
    pub connect_timeout: Duration,
    /// Connection lifetime ceiling; keeps long exports from pinning
    /// server-side connections forever.
    pub max_lifetime: Duration,
    /// Per-statement execution ceiling applied on connect.
    pub query_timeout: Duration,
}

impl CatalogConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 3306,
            database: None,
            username: None,
            max_connections: 10,
            min_idle_connections: 5,
            connect_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(300),
            query_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Validates pool limits and timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::SchemaDumpError::configuration(
                "Connection host must not be empty",
            ));
        }
        if self.max_connections == 0 {
            return Err(crate::error::SchemaDumpError::configuration(
                "max_connections must be at least 1",
            ));
        }
        if self.min_idle_connections > self.max_connections {
            return Err(crate::error::SchemaDumpError::configuration(
                "min_idle_connections must not exceed max_connections",
            ));
        }
        if self.connect_timeout.is_zero() || self.query_timeout.is_zero() {
            return Err(crate::error::SchemaDumpError::configuration(
                "timeouts must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// MySQL catalog handle: a connection pool plus its configuration.
///
/// Every statement the catalog executes is also recorded to the attached
/// [`HistorySink`] (fire-and-forget).
pub struct MySqlCatalog {
    /// Connection pool for catalog queries
    pub pool: MySqlPool,
    /// Connection configuration (pool settings, timeouts)
    pub config: CatalogConfig,
    /// Original connection URL, kept private to prevent credential exposure
    connection_url: String,
    history: Arc<dyn HistorySink>,
}

impl std::fmt::Debug for MySqlCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlCatalog")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish_non_exhaustive()
    }
}

impl MySqlCatalog {
    /// Creates a catalog handle from a `mysql://` connection URL.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or the pool cannot be
    /// configured.
    pub async fn new(connection_string: &str) -> Result<Self> {
        Self::with_history(connection_string, Arc::new(NoopHistory)).await
    }

    /// Creates a catalog handle with an attached query-history sink.
    pub async fn with_history(
        connection_string: &str,
        history: Arc<dyn HistorySink>,
    ) -> Result<Self> {
        let config = connection::parse_connection_config(connection_string)?;
        let pool = connection::create_connection_pool(connection_string, &config).await?;

        Ok(Self {
            pool,
            config,
            connection_url: connection_string.to_string(),
            history,
        })
    }

    /// Tests connectivity and `INFORMATION_SCHEMA` access.
    pub async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::SchemaDumpError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(crate::error::SchemaDumpError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        let schema_access_test: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = 'information_schema'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            crate::error::SchemaDumpError::catalog_failed("Cannot access INFORMATION_SCHEMA", e)
        })?;

        if schema_access_test == 0 {
            return Err(crate::error::SchemaDumpError::configuration(
                "No access to INFORMATION_SCHEMA tables",
            ));
        }

        Ok(())
    }

    /// Enumerates databases visible to the connected account.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        objects::list_databases(self).await
    }

    /// Enumerates tables, views, procedures, and functions of one database.
    ///
    /// The returned order is catalog-arbitrary; callers that need the fixed
    /// display ordering apply [`crate::models::sort_for_export`].
    pub async fn list_objects(&self, db_name: &str) -> Result<Vec<SchemaObject>> {
        objects::list_objects(self, db_name).await
    }

    /// Fetches routine attributes and its ordered parameter list.
    pub async fn routine_metadata(
        &self,
        name: &str,
        db_name: &str,
        kind: crate::models::ObjectKind,
    ) -> Result<(RoutineMetadata, Vec<Parameter>)> {
        routines::routine_metadata(self, name, db_name, kind).await
    }

    /// Resolves the full return type of a routine (function return column,
    /// or a procedure's first OUT parameter).
    pub async fn full_return_type(&self, name: &str, db_name: &str) -> Result<String> {
        routines::full_return_type(self, name, db_name).await
    }

    /// Generates a connection URL for a different database on the same
    /// server. Used by the exporter to open its dedicated pool.
    pub fn connection_url_for_database(&self, database: &str) -> Result<String> {
        if database.is_empty() || database.len() > 64 {
            return Err(crate::error::SchemaDumpError::configuration(format!(
                "Invalid database name length: must be 1-64 characters, got {}",
                database.len()
            )));
        }

        if database.contains(';') || database.contains('\'') || database.contains('"') {
            return Err(crate::error::SchemaDumpError::configuration(
                "Database name contains invalid characters",
            ));
        }

        let mut url = url::Url::parse(&self.connection_url).map_err(|e| {
            crate::error::SchemaDumpError::configuration(format!(
                "Failed to parse connection URL: {}",
                e
            ))
        })?;

        url.set_path(&format!("/{}", database));

        Ok(url.to_string())
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn record_history(&self, statement: &str, db_name: &str) {
        self.history.record(statement, db_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_validation() {
        let config = CatalogConfig::new("localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_idle_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_connections() {
        let mut config = CatalogConfig::new("localhost");
        config.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_idle_above_max() {
        let mut config = CatalogConfig::new("localhost");
        config.max_connections = 2;
        config.min_idle_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_empty_host() {
        let config = CatalogConfig::new("");
        assert!(config.validate().is_err());
    }
}
