//! Schema extraction: walks the catalog and builds a [`Schema`] snapshot.
//!
//! # Module structure
//! - `tables`: base tables with columns, indexes, foreign keys and the
//!   server's creation statement
//! - `objects`: views, triggers and scheduled events
//! - `routines`: stored functions and procedures, with `SHOW CREATE`
//!   supersession over the catalog body
//!
//! Extraction is all-or-nothing: any catalog query failure aborts the run
//! and no partial snapshot is returned.

pub mod objects;
pub mod routines;
pub mod tables;

use chrono::Utc;

use crate::error::{Result, SchemaPortError};
use crate::gateway::MetadataGateway;
use crate::models::{FORMAT_VERSION, Schema};

/// Options for one extraction run. Each object kind toggles independently;
/// the table list and system-prefix filters apply to tables only.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Restrict extraction to these table names. Names that do not exist
    /// simply produce no table; existence checking is the caller's concern.
    pub tables: Option<Vec<String>>,
    /// Skip tables whose name starts with this prefix (the installation's
    /// system-table naming convention).
    pub exclude_prefix: Option<String>,
    pub include_tables: bool,
    pub include_views: bool,
    pub include_functions: bool,
    pub include_procedures: bool,
    pub include_triggers: bool,
    pub include_events: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            tables: None,
            exclude_prefix: None,
            include_tables: true,
            include_views: true,
            include_functions: true,
            include_procedures: true,
            include_triggers: true,
            include_events: true,
        }
    }
}

impl ExtractOptions {
    /// Options that extract base tables and nothing else.
    pub fn tables_only() -> Self {
        Self {
            include_views: false,
            include_functions: false,
            include_procedures: false,
            include_triggers: false,
            include_events: false,
            ..Self::default()
        }
    }
}

/// Walks catalog metadata for the gateway's active database and assembles
/// snapshots.
pub struct SchemaExtractor<'a> {
    gateway: &'a MetadataGateway,
}

impl<'a> SchemaExtractor<'a> {
    /// Creates an extractor bound to the given gateway session.
    pub fn new(gateway: &'a MetadataGateway) -> Self {
        Self { gateway }
    }

    pub(crate) fn gateway(&self) -> &MetadataGateway {
        self.gateway
    }

    /// Extracts a full snapshot of the active database.
    ///
    /// The six per-kind fetches have no ordering dependency and are issued
    /// concurrently; their results are joined into one stamped [`Schema`].
    pub async fn extract_schema(&self, options: &ExtractOptions) -> Result<Schema> {
        let db_name = self.gateway.current_database()?.to_string();
        let started = std::time::Instant::now();

        tracing::info!("starting schema extraction for database {db_name}");

        let (server_version, charset, collation) = self.database_facts(&db_name).await?;

        let (tables, views, functions, procedures, triggers, events) = tokio::try_join!(
            async {
                if options.include_tables {
                    self.extract_tables(options).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_views {
                    self.extract_views().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_functions {
                    self.extract_functions().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_procedures {
                    self.extract_procedures().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_triggers {
                    self.extract_triggers().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if options.include_events {
                    self.extract_events().await
                } else {
                    Ok(Vec::new())
                }
            },
        )?;

        tracing::info!(
            "schema extraction completed in {:.2}s: {} tables, {} views, {} functions, {} procedures, {} triggers, {} events",
            started.elapsed().as_secs_f64(),
            tables.len(),
            views.len(),
            functions.len(),
            procedures.len(),
            triggers.len(),
            events.len()
        );

        Ok(Schema {
            format_version: FORMAT_VERSION.to_string(),
            database: db_name,
            charset,
            collation,
            server_version: Some(server_version),
            extracted_at: Utc::now(),
            tables,
            views,
            functions,
            procedures,
            triggers,
            events,
        })
    }

    /// Server version and the database's default charset/collation.
    async fn database_facts(
        &self,
        db_name: &str,
    ) -> Result<(String, Option<String>, Option<String>)> {
        use sqlx::Row;

        let version: String = sqlx::query_scalar("SELECT VERSION()")
            .fetch_one(self.gateway.pool())
            .await
            .map_err(|e| SchemaPortError::extraction_failed("failed to get server version", e))?;

        let row = sqlx::query(
            r"
            SELECT
                CAST(DEFAULT_CHARACTER_SET_NAME AS CHAR) AS charset,
                CAST(DEFAULT_COLLATION_NAME AS CHAR) AS collation
            FROM INFORMATION_SCHEMA.SCHEMATA
            WHERE SCHEMA_NAME = ?
            ",
        )
        .bind(db_name)
        .fetch_optional(self.gateway.pool())
        .await
        .map_err(|e| SchemaPortError::extraction_failed("failed to query database defaults", e))?;

        let (charset, collation) = match row {
            Some(row) => (
                row.try_get("charset").ok(),
                row.try_get("collation").ok(),
            ),
            None => (None, None),
        };

        Ok((version, charset, collation))
    }
}
