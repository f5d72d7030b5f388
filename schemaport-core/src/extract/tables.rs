//! Base-table extraction: columns, indexes, foreign keys and the server's
//! creation statement.
//!
//! Catalog strings are `CAST(... AS CHAR)` to avoid VARBINARY results on
//! MySQL 8.0+.

use sqlx::Row;

use super::{ExtractOptions, SchemaExtractor};
use crate::error::{Result, SchemaPortError};
use crate::ident;
use crate::models::{Column, ColumnKey, ForeignKey, Index, ReferentialAction, Table};

impl SchemaExtractor<'_> {
    /// Extracts base tables, honoring the options' name set and
    /// system-prefix filters. A filter naming no existing table yields an
    /// empty list, not an error.
    pub async fn extract_tables(&self, options: &ExtractOptions) -> Result<Vec<Table>> {
        let db_name = self.gateway().current_database()?.to_string();

        let rows = sqlx::query(
            r"
            SELECT
                CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
                CAST(ENGINE AS CHAR) AS ENGINE,
                CAST(TABLE_COLLATION AS CHAR) AS TABLE_COLLATION,
                CAST(TABLE_COMMENT AS CHAR) AS TABLE_COMMENT
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ?
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            ",
        )
        .bind(&db_name)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| SchemaPortError::extraction_failed("failed to enumerate tables", e))?;

        let mut tables = Vec::new();

        for row in &rows {
            let name: String = row.try_get("TABLE_NAME").map_err(|e| {
                SchemaPortError::extraction_failed("failed to parse table name", e)
            })?;

            if let Some(wanted) = &options.tables
                && !wanted.contains(&name)
            {
                continue;
            }
            if let Some(prefix) = &options.exclude_prefix
                && name.starts_with(prefix.as_str())
            {
                tracing::debug!("skipping system table {name}");
                continue;
            }

            let engine: Option<String> = row.try_get("ENGINE").ok();
            let collation: Option<String> = row.try_get("TABLE_COLLATION").ok();
            let comment: Option<String> = row
                .try_get::<Option<String>, _>("TABLE_COMMENT")
                .ok()
                .flatten()
                .filter(|c| !c.is_empty());

            let columns = self.extract_columns(&db_name, &name).await?;
            let indexes = self.extract_indexes(&db_name, &name).await?;
            let foreign_keys = self.extract_foreign_keys(&db_name, &name).await?;
            let create_statement = self.fetch_create_statement(&db_name, &name).await?;

            tracing::debug!(
                "extracted table {name}: {} columns, {} index entries, {} foreign keys",
                columns.len(),
                indexes.len(),
                foreign_keys.len()
            );

            tables.push(Table {
                name,
                columns,
                indexes,
                foreign_keys,
                engine,
                collation,
                comment,
                create_statement,
            });
        }

        Ok(tables)
    }

    /// Columns of one table, ordinal-ordered.
    async fn extract_columns(&self, db_name: &str, table: &str) -> Result<Vec<Column>> {
        let rows = sqlx::query(
            r"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR) AS COLUMN_TYPE,
                CAST(IS_NULLABLE AS CHAR) AS IS_NULLABLE,
                CAST(COLUMN_DEFAULT AS CHAR) AS COLUMN_DEFAULT,
                CAST(EXTRA AS CHAR) AS EXTRA,
                CAST(COLUMN_COMMENT AS CHAR) AS COLUMN_COMMENT,
                CAST(CHARACTER_SET_NAME AS CHAR) AS CHARACTER_SET_NAME,
                CAST(COLLATION_NAME AS CHAR) AS COLLATION_NAME,
                CAST(COLUMN_KEY AS CHAR) AS COLUMN_KEY
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ?
            AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            ",
        )
        .bind(db_name)
        .bind(table)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| {
            SchemaPortError::extraction_failed(
                format!("failed to collect columns for table '{table}'"),
                e,
            )
        })?;

        let mut columns = Vec::new();
        for row in &rows {
            let name: String = row.try_get("COLUMN_NAME").map_err(|e| {
                SchemaPortError::extraction_failed("failed to parse column name", e)
            })?;
            let is_nullable: String = row.try_get("IS_NULLABLE").unwrap_or_default();
            let key: String = row.try_get("COLUMN_KEY").unwrap_or_default();

            columns.push(Column {
                name,
                column_type: row.try_get("COLUMN_TYPE").unwrap_or_default(),
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                default: row.try_get::<Option<String>, _>("COLUMN_DEFAULT").ok().flatten(),
                extra: row.try_get("EXTRA").unwrap_or_default(),
                comment: row
                    .try_get::<Option<String>, _>("COLUMN_COMMENT")
                    .ok()
                    .flatten()
                    .filter(|c| !c.is_empty()),
                charset: row.try_get("CHARACTER_SET_NAME").ok(),
                collation: row.try_get("COLLATION_NAME").ok(),
                key: ColumnKey::from_catalog(&key),
            });
        }

        Ok(columns)
    }

    /// Index entries of one table, one row per (column, position), grouped
    /// by index name through the ordering.
    async fn extract_indexes(&self, db_name: &str, table: &str) -> Result<Vec<Index>> {
        let rows = sqlx::query(
            r"
            SELECT
                CAST(INDEX_NAME AS CHAR) AS INDEX_NAME,
                CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME,
                SEQ_IN_INDEX,
                NON_UNIQUE,
                CAST(INDEX_TYPE AS CHAR) AS INDEX_TYPE,
                CARDINALITY,
                CAST(INDEX_COMMENT AS CHAR) AS INDEX_COMMENT
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ?
            AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            ",
        )
        .bind(db_name)
        .bind(table)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| {
            SchemaPortError::extraction_failed(
                format!("failed to collect indexes for table '{table}'"),
                e,
            )
        })?;

        let mut indexes = Vec::new();
        for row in &rows {
            let non_unique: i64 = row.try_get("NON_UNIQUE").unwrap_or(1);
            let seq: i64 = row.try_get::<i64, _>("SEQ_IN_INDEX").unwrap_or(1);

            indexes.push(Index {
                name: row.try_get("INDEX_NAME").unwrap_or_default(),
                table: table.to_string(),
                column: row.try_get("COLUMN_NAME").unwrap_or_default(),
                seq_in_index: u32::try_from(seq).unwrap_or(1),
                unique: non_unique == 0,
                index_type: row.try_get("INDEX_TYPE").ok(),
                cardinality: row.try_get::<Option<i64>, _>("CARDINALITY").ok().flatten(),
                comment: row
                    .try_get::<Option<String>, _>("INDEX_COMMENT")
                    .ok()
                    .flatten()
                    .filter(|c| !c.is_empty()),
            });
        }

        Ok(indexes)
    }

    /// Foreign keys of one table, one entry per constrained column, joined
    /// against the referential-action metadata. Missing rules default to
    /// `RESTRICT`.
    async fn extract_foreign_keys(&self, db_name: &str, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            r"
            SELECT
                CAST(kcu.CONSTRAINT_NAME AS CHAR) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            LEFT JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
                ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
                AND kcu.TABLE_SCHEMA = rc.CONSTRAINT_SCHEMA
            WHERE kcu.TABLE_SCHEMA = ?
            AND kcu.TABLE_NAME = ?
            AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
            ",
        )
        .bind(db_name)
        .bind(table)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| {
            SchemaPortError::extraction_failed(
                format!("failed to collect foreign keys for table '{table}'"),
                e,
            )
        })?;

        let mut foreign_keys = Vec::new();
        for row in &rows {
            let update_rule: Option<String> =
                row.try_get::<Option<String>, _>("UPDATE_RULE").ok().flatten();
            let delete_rule: Option<String> =
                row.try_get::<Option<String>, _>("DELETE_RULE").ok().flatten();

            foreign_keys.push(ForeignKey {
                name: row.try_get("CONSTRAINT_NAME").unwrap_or_default(),
                table: table.to_string(),
                column: row.try_get("COLUMN_NAME").unwrap_or_default(),
                referenced_table: row.try_get("REFERENCED_TABLE_NAME").unwrap_or_default(),
                referenced_column: row.try_get("REFERENCED_COLUMN_NAME").unwrap_or_default(),
                on_update: ReferentialAction::from_catalog(update_rule.as_deref()),
                on_delete: ReferentialAction::from_catalog(delete_rule.as_deref()),
            });
        }

        Ok(foreign_keys)
    }

    /// The server's own creation statement, rewritten with an `IF NOT
    /// EXISTS` guard so replays are idempotent.
    async fn fetch_create_statement(
        &self,
        db_name: &str,
        table: &str,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SHOW CREATE TABLE {}",
            ident::quote_qualified(db_name, table)?
        );
        let row = sqlx::query(&sql)
            .fetch_optional(self.gateway().pool())
            .await
            .map_err(|e| {
                SchemaPortError::extraction_failed(
                    format!("failed to fetch creation statement for table '{table}'"),
                    e,
                )
            })?;

        Ok(row
            .and_then(|r| r.try_get::<String, _>(1).ok())
            .map(|stmt| ensure_guarded(&stmt)))
    }
}

/// Inserts an "only if absent" guard into a table creation statement when
/// one is not already present.
pub(crate) fn ensure_guarded(statement: &str) -> String {
    if statement.contains("IF NOT EXISTS") {
        statement.to_string()
    } else {
        statement.replacen("CREATE TABLE", "CREATE TABLE IF NOT EXISTS", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_inserted_once() {
        let guarded = ensure_guarded("CREATE TABLE `user` (\n  `id` int\n)");
        assert!(guarded.starts_with("CREATE TABLE IF NOT EXISTS `user`"));
    }

    #[test]
    fn existing_guard_preserved() {
        let original = "CREATE TABLE IF NOT EXISTS `user` (`id` int)";
        assert_eq!(ensure_guarded(original), original);
    }
}
