//! Stored function and procedure extraction.
//!
//! The server's `SHOW CREATE FUNCTION|PROCEDURE` output is the preferred
//! body because the catalog's `ROUTINE_DEFINITION` drops the header. The
//! preferred call can fail on restricted accounts, so each routine goes
//! through an explicit preferred-then-fallback step that logs which source
//! won; a single failing routine never aborts the extraction.

use sqlx::Row;

use super::SchemaExtractor;
use crate::error::{Result, SchemaPortError};
use crate::ident;
use crate::models::{Routine, RoutineKind};

impl SchemaExtractor<'_> {
    /// Extracts every stored function of the active database.
    pub async fn extract_functions(&self) -> Result<Vec<Routine>> {
        self.extract_routines(RoutineKind::Function).await
    }

    /// Extracts every stored procedure of the active database.
    pub async fn extract_procedures(&self) -> Result<Vec<Routine>> {
        self.extract_routines(RoutineKind::Procedure).await
    }

    async fn extract_routines(&self, kind: RoutineKind) -> Result<Vec<Routine>> {
        let db_name = self.gateway().current_database()?.to_string();

        let rows = sqlx::query(
            r"
            SELECT
                CAST(ROUTINE_NAME AS CHAR) AS ROUTINE_NAME,
                CAST(ROUTINE_DEFINITION AS CHAR) AS ROUTINE_DEFINITION,
                CAST(DTD_IDENTIFIER AS CHAR) AS DTD_IDENTIFIER,
                CAST(DEFINER AS CHAR) AS DEFINER,
                CAST(CREATED AS CHAR) AS CREATED,
                CAST(LAST_ALTERED AS CHAR) AS LAST_ALTERED,
                CAST(SQL_DATA_ACCESS AS CHAR) AS SQL_DATA_ACCESS,
                CAST(IS_DETERMINISTIC AS CHAR) AS IS_DETERMINISTIC,
                CAST(SECURITY_TYPE AS CHAR) AS SECURITY_TYPE,
                CAST(ROUTINE_COMMENT AS CHAR) AS ROUTINE_COMMENT
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_SCHEMA = ?
            AND ROUTINE_TYPE = ?
            ORDER BY ROUTINE_NAME
            ",
        )
        .bind(&db_name)
        .bind(kind.keyword())
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| {
            SchemaPortError::extraction_failed(
                format!("failed to enumerate {}s", kind.keyword().to_lowercase()),
                e,
            )
        })?;

        let mut routines = Vec::new();
        for row in &rows {
            let name: String = row.try_get("ROUTINE_NAME").unwrap_or_default();
            let catalog_body: String = row
                .try_get::<Option<String>, _>("ROUTINE_DEFINITION")
                .ok()
                .flatten()
                .unwrap_or_default();
            let deterministic: String = row.try_get("IS_DETERMINISTIC").unwrap_or_default();

            let body = self
                .preferred_routine_body(&db_name, &name, kind, catalog_body)
                .await;

            routines.push(Routine {
                name,
                kind,
                body,
                returns: match kind {
                    RoutineKind::Function => row
                        .try_get::<Option<String>, _>("DTD_IDENTIFIER")
                        .ok()
                        .flatten(),
                    RoutineKind::Procedure => None,
                },
                definer: row.try_get("DEFINER").ok(),
                created: row.try_get::<Option<String>, _>("CREATED").ok().flatten(),
                modified: row
                    .try_get::<Option<String>, _>("LAST_ALTERED")
                    .ok()
                    .flatten(),
                data_access: row.try_get("SQL_DATA_ACCESS").ok(),
                deterministic: deterministic.eq_ignore_ascii_case("YES"),
                security_type: row.try_get("SECURITY_TYPE").ok(),
                comment: row
                    .try_get::<Option<String>, _>("ROUTINE_COMMENT")
                    .ok()
                    .flatten()
                    .filter(|c| !c.is_empty()),
            });
        }

        tracing::debug!(
            "extracted {} {}s",
            routines.len(),
            kind.keyword().to_lowercase()
        );
        Ok(routines)
    }

    /// Preferred-then-fallback body resolution: try the server's full
    /// creation statement, fall back to the catalog body on failure.
    async fn preferred_routine_body(
        &self,
        db_name: &str,
        name: &str,
        kind: RoutineKind,
        fallback: String,
    ) -> String {
        match self.show_create_routine(db_name, name, kind).await {
            Ok(Some(statement)) => {
                tracing::debug!("{} {name}: using server creation statement", kind.keyword());
                statement
            }
            Ok(None) => {
                tracing::debug!("{} {name}: no creation statement, using catalog body", kind.keyword());
                fallback
            }
            Err(e) => {
                tracing::warn!(
                    "{} {name}: SHOW CREATE failed ({e}), falling back to catalog body",
                    kind.keyword()
                );
                fallback
            }
        }
    }

    async fn show_create_routine(
        &self,
        db_name: &str,
        name: &str,
        kind: RoutineKind,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SHOW CREATE {} {}",
            kind.keyword(),
            ident::quote_qualified(db_name, name)?
        );
        let row = sqlx::query(&sql)
            .fetch_optional(self.gateway().pool())
            .await
            .map_err(|e| {
                SchemaPortError::extraction_failed(
                    format!("SHOW CREATE {} '{name}' failed", kind.keyword()),
                    e,
                )
            })?;

        // Column 2 holds the statement; it is NULL when the account lacks
        // privileges on the routine body.
        Ok(row.and_then(|r| r.try_get::<Option<String>, _>(2).ok().flatten()))
    }
}
