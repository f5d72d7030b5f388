//! Metadata gateway: the single database session used by a call chain.
//!
//! The gateway owns the connection pool and the name of the currently
//! active database. It is passed explicitly to the extractor and importer
//! constructors; there is no process-wide handle.
//!
//! DDL statements and `FOREIGN_KEY_CHECKS` toggling are session-global, so
//! the import path runs on a single-connection pool
//! ([`ConnectionConfig::for_import`]) and switching databases rebuilds the
//! pool instead of issuing `USE` against one pooled connection.

use std::time::Duration;

use sqlx::MySqlPool;
use url::Url;

use crate::error::{Result, SchemaPortError, redact_database_url};

/// Configuration for a gateway session.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
    pub max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            max_connections: 10,
        }
    }
}

impl ConnectionConfig {
    /// Narrows the pool to one connection for apply workflows, so session
    /// state set by the importer is seen by every statement it issues.
    #[must_use]
    pub fn for_import(mut self) -> Self {
        self.max_connections = 1;
        self
    }

    /// Validates field ranges, rejecting values the server would not accept.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SchemaPortError::configuration("host must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(SchemaPortError::configuration(
                "max_connections must be at least 1",
            ));
        }
        if let Some(db) = &self.database
            && (db.is_empty() || db.len() > 64)
        {
            return Err(SchemaPortError::configuration(
                "database name must be 1-64 characters",
            ));
        }
        Ok(())
    }
}

/// Parses a `mysql://` connection URL into a [`ConnectionConfig`].
pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    let url = validate_connection_string(connection_string)?;

    let mut config = ConnectionConfig {
        host: url.host_str().unwrap_or("localhost").to_string(),
        port: url.port().or(Some(3306)),
        ..ConnectionConfig::default()
    };

    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        config.database = Some(database.to_string());
    }
    if !url.username().is_empty() {
        config.username = Some(url.username().to_string());
    }

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => {
                if let Ok(secs) = value.parse::<u64>()
                    && secs > 0
                    && secs <= 300
                {
                    config.connect_timeout = Duration::from_secs(secs);
                }
            }
            "pool_max_conns" => {
                if let Ok(conns) = value.parse::<u32>()
                    && conns > 0
                    && conns <= 100
                {
                    config.max_connections = conns;
                }
            }
            _ => {}
        }
    }

    config.validate()?;
    Ok(config)
}

/// Validates scheme and host of a connection string.
fn validate_connection_string(connection_string: &str) -> Result<Url> {
    let url = Url::parse(connection_string).map_err(|e| {
        SchemaPortError::configuration(format!("invalid connection string format: {e}"))
    })?;

    if url.scheme() != "mysql" {
        return Err(SchemaPortError::configuration(
            "connection string must use the mysql:// scheme",
        ));
    }
    if url.host_str().is_none() {
        return Err(SchemaPortError::configuration(
            "connection string must specify a host",
        ));
    }
    Ok(url)
}

/// The database session shared by one extract or apply call chain.
pub struct MetadataGateway {
    pool: MySqlPool,
    config: ConnectionConfig,
    // Kept private so credentials never appear in Debug output or logs.
    connection_url: String,
}

impl std::fmt::Debug for MetadataGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataGateway")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl MetadataGateway {
    /// Connects to the server and verifies catalog access.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = parse_connection_config(connection_string)?;
        Self::connect_with(connection_string, config).await
    }

    /// Connects for an apply workflow: a single-connection pool, so that
    /// session-global toggles hold across every statement of the run.
    pub async fn connect_for_import(connection_string: &str) -> Result<Self> {
        let config = parse_connection_config(connection_string)?.for_import();
        Self::connect_with(connection_string, config).await
    }

    /// Connects with an explicit configuration, verifying catalog access.
    pub async fn connect_with(
        connection_string: &str,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let gateway = Self::connect_lazy_with(connection_string, config)?;
        gateway.ping().await?;
        Ok(gateway)
    }

    /// Builds a gateway without touching the server. Connections are opened
    /// on first use; dry-run workflows never open one.
    pub fn connect_lazy(connection_string: &str) -> Result<Self> {
        let config = parse_connection_config(connection_string)?;
        Self::connect_lazy_with(connection_string, config)
    }

    /// Lazy construction with an explicit configuration.
    pub fn connect_lazy_with(
        connection_string: &str,
        config: ConnectionConfig,
    ) -> Result<Self> {
        validate_connection_string(connection_string)?;
        config.validate()?;

        let query_timeout_ms = config.query_timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .acquire_timeout(config.connect_timeout)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    use sqlx::Executor;
                    conn.execute(
                        format!("SET max_execution_time = {query_timeout_ms}").as_str(),
                    )
                    .await?;
                    conn.execute("SET time_zone = '+00:00'").await?;
                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| {
                SchemaPortError::extraction_failed(
                    format!(
                        "failed to create connection pool for {}",
                        redact_database_url(connection_string)
                    ),
                    e,
                )
            })?;

        Ok(Self {
            pool,
            config,
            connection_url: connection_string.to_string(),
        })
    }

    /// The underlying pool, for catalog queries.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// The session configuration (no credentials).
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The currently active database name, if the URL named one.
    pub fn database(&self) -> Option<&str> {
        self.config.database.as_deref()
    }

    /// The currently active database name, erroring when the connection
    /// string did not select one.
    pub fn current_database(&self) -> Result<&str> {
        self.database().ok_or_else(|| {
            SchemaPortError::configuration(
                "no database selected: the connection string must name one",
            )
        })
    }

    /// Verifies connectivity and catalog access with a trivial query.
    pub async fn ping(&self) -> Result<()> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(SchemaPortError::connection_failed)?;
        if one != 1 {
            return Err(SchemaPortError::configuration(
                "connectivity test returned an unexpected result",
            ));
        }
        Ok(())
    }

    /// Executes a DDL or session statement, returning affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let outcome = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| SchemaPortError::execution_failed("statement rejected by the server", e))?;
        Ok(outcome.rows_affected())
    }

    /// Checks whether a database exists on the server.
    pub async fn database_exists(&self, name: &str) -> Result<bool> {
        let row: Option<String> = sqlx::query_scalar(
            "SELECT CAST(SCHEMA_NAME AS CHAR) FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SchemaPortError::execution_failed("failed to query schemata", e))?;
        Ok(row.is_some())
    }

    /// A gateway for another database on the same server, preserving this
    /// session's configuration. The pool is rebuilt; no `USE` is issued.
    pub fn for_database(&self, database: &str) -> Result<Self> {
        if database.is_empty() || database.len() > 64 {
            return Err(SchemaPortError::configuration(format!(
                "invalid database name length: must be 1-64 characters, got {}",
                database.len()
            )));
        }
        crate::ident::quote(database)?;

        let mut url = Url::parse(&self.connection_url).map_err(|e| {
            SchemaPortError::configuration(format!("failed to parse connection URL: {e}"))
        })?;
        url.set_path(&format!("/{database}"));

        let mut config = self.config.clone();
        config.database = Some(database.to_string());
        Self::connect_lazy_with(url.as_str(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_url() {
        let config = parse_connection_config("mysql://app@db.internal:3307/shop").unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(3307));
        assert_eq!(config.database.as_deref(), Some("shop"));
        assert_eq!(config.username.as_deref(), Some("app"));
    }

    #[test]
    fn defaults_port_to_3306() {
        let config = parse_connection_config("mysql://localhost/shop").unwrap();
        assert_eq!(config.port, Some(3306));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(parse_connection_config("postgres://localhost/shop").is_err());
    }

    #[test]
    fn honours_pool_query_parameters() {
        let config =
            parse_connection_config("mysql://localhost/shop?pool_max_conns=2&connect_timeout=5")
                .unwrap();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn lazy_gateway_builds_without_a_server() {
        let gateway = MetadataGateway::connect_lazy("mysql://app@localhost/shop").unwrap();
        assert_eq!(gateway.database(), Some("shop"));
    }

    #[test]
    fn import_config_narrows_to_one_connection() {
        let config = parse_connection_config("mysql://app@localhost/shop")
            .unwrap()
            .for_import();
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.database.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn for_database_rewrites_the_target() {
        let gateway = MetadataGateway::connect_lazy("mysql://app@localhost/shop").unwrap();
        let other = gateway.for_database("shop_clone").unwrap();
        assert_eq!(other.database(), Some("shop_clone"));
        assert!(gateway.for_database("bad`name").is_err());
    }
}
