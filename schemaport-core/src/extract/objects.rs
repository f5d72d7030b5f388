//! Extraction of views, triggers and scheduled events: one catalog query
//! per kind.

use sqlx::Row;

use super::SchemaExtractor;
use crate::error::{Result, SchemaPortError};
use crate::models::{Event, EventSchedule, Trigger, TriggerEvent, TriggerTiming, View};

impl SchemaExtractor<'_> {
    /// Extracts every view of the active database.
    pub async fn extract_views(&self) -> Result<Vec<View>> {
        let db_name = self.gateway().current_database()?;

        let rows = sqlx::query(
            r"
            SELECT
                CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
                CAST(VIEW_DEFINITION AS CHAR) AS VIEW_DEFINITION,
                CAST(CHECK_OPTION AS CHAR) AS CHECK_OPTION,
                CAST(IS_UPDATABLE AS CHAR) AS IS_UPDATABLE,
                CAST(DEFINER AS CHAR) AS DEFINER,
                CAST(SECURITY_TYPE AS CHAR) AS SECURITY_TYPE,
                CAST(CHARACTER_SET_CLIENT AS CHAR) AS CHARACTER_SET_CLIENT,
                CAST(COLLATION_CONNECTION AS CHAR) AS COLLATION_CONNECTION
            FROM INFORMATION_SCHEMA.VIEWS
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME
            ",
        )
        .bind(db_name)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| SchemaPortError::extraction_failed("failed to collect views", e))?;

        let mut views = Vec::new();
        for row in &rows {
            let is_updatable: String = row.try_get("IS_UPDATABLE").unwrap_or_default();
            views.push(View {
                name: row.try_get("TABLE_NAME").unwrap_or_default(),
                definition: row
                    .try_get::<Option<String>, _>("VIEW_DEFINITION")
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
                check_option: row.try_get("CHECK_OPTION").ok(),
                is_updatable: is_updatable.eq_ignore_ascii_case("YES"),
                definer: row.try_get("DEFINER").ok(),
                security_type: row.try_get("SECURITY_TYPE").ok(),
                charset: row.try_get("CHARACTER_SET_CLIENT").ok(),
                collation: row.try_get("COLLATION_CONNECTION").ok(),
            });
        }

        tracing::debug!("extracted {} views", views.len());
        Ok(views)
    }

    /// Extracts every trigger of the active database.
    pub async fn extract_triggers(&self) -> Result<Vec<Trigger>> {
        let db_name = self.gateway().current_database()?;

        let rows = sqlx::query(
            r"
            SELECT
                CAST(TRIGGER_NAME AS CHAR) AS TRIGGER_NAME,
                CAST(EVENT_OBJECT_TABLE AS CHAR) AS EVENT_OBJECT_TABLE,
                CAST(ACTION_TIMING AS CHAR) AS ACTION_TIMING,
                CAST(EVENT_MANIPULATION AS CHAR) AS EVENT_MANIPULATION,
                CAST(ACTION_STATEMENT AS CHAR) AS ACTION_STATEMENT,
                CAST(DEFINER AS CHAR) AS DEFINER,
                CAST(SQL_MODE AS CHAR) AS SQL_MODE,
                CAST(CREATED AS CHAR) AS CREATED,
                CAST(CHARACTER_SET_CLIENT AS CHAR) AS CHARACTER_SET_CLIENT,
                CAST(COLLATION_CONNECTION AS CHAR) AS COLLATION_CONNECTION
            FROM INFORMATION_SCHEMA.TRIGGERS
            WHERE TRIGGER_SCHEMA = ?
            ORDER BY TRIGGER_NAME
            ",
        )
        .bind(db_name)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| SchemaPortError::extraction_failed("failed to collect triggers", e))?;

        let mut triggers = Vec::new();
        for row in &rows {
            let timing: String = row.try_get("ACTION_TIMING").unwrap_or_default();
            let event: String = row.try_get("EVENT_MANIPULATION").unwrap_or_default();
            triggers.push(Trigger {
                name: row.try_get("TRIGGER_NAME").unwrap_or_default(),
                table: row.try_get("EVENT_OBJECT_TABLE").unwrap_or_default(),
                timing: TriggerTiming::from_catalog(&timing),
                event: TriggerEvent::from_catalog(&event),
                statement: row.try_get("ACTION_STATEMENT").unwrap_or_default(),
                definer: row.try_get("DEFINER").ok(),
                sql_mode: row.try_get("SQL_MODE").ok(),
                created: row.try_get::<Option<String>, _>("CREATED").ok().flatten(),
                charset: row.try_get("CHARACTER_SET_CLIENT").ok(),
                collation: row.try_get("COLLATION_CONNECTION").ok(),
            });
        }

        tracing::debug!("extracted {} triggers", triggers.len());
        Ok(triggers)
    }

    /// Extracts every scheduled event of the active database.
    pub async fn extract_events(&self) -> Result<Vec<Event>> {
        let db_name = self.gateway().current_database()?;

        let rows = sqlx::query(
            r"
            SELECT
                CAST(EVENT_NAME AS CHAR) AS EVENT_NAME,
                CAST(DEFINER AS CHAR) AS DEFINER,
                CAST(TIME_ZONE AS CHAR) AS TIME_ZONE,
                CAST(EVENT_TYPE AS CHAR) AS EVENT_TYPE,
                CAST(EXECUTE_AT AS CHAR) AS EXECUTE_AT,
                CAST(INTERVAL_VALUE AS CHAR) AS INTERVAL_VALUE,
                CAST(INTERVAL_FIELD AS CHAR) AS INTERVAL_FIELD,
                CAST(STATUS AS CHAR) AS STATUS,
                CAST(ON_COMPLETION AS CHAR) AS ON_COMPLETION,
                CAST(STARTS AS CHAR) AS STARTS,
                CAST(EVENT_DEFINITION AS CHAR) AS EVENT_DEFINITION,
                CAST(EVENT_COMMENT AS CHAR) AS EVENT_COMMENT
            FROM INFORMATION_SCHEMA.EVENTS
            WHERE EVENT_SCHEMA = ?
            ORDER BY EVENT_NAME
            ",
        )
        .bind(db_name)
        .fetch_all(self.gateway().pool())
        .await
        .map_err(|e| SchemaPortError::extraction_failed("failed to collect events", e))?;

        let mut events = Vec::new();
        for row in &rows {
            let event_type: String = row.try_get("EVENT_TYPE").unwrap_or_default();
            let schedule = if event_type.eq_ignore_ascii_case("ONE TIME") {
                EventSchedule::OneTime {
                    execute_at: row
                        .try_get::<Option<String>, _>("EXECUTE_AT")
                        .ok()
                        .flatten()
                        .unwrap_or_default(),
                }
            } else {
                EventSchedule::Recurring {
                    interval_value: row
                        .try_get::<Option<String>, _>("INTERVAL_VALUE")
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "1".to_string()),
                    interval_field: row
                        .try_get::<Option<String>, _>("INTERVAL_FIELD")
                        .ok()
                        .flatten()
                        .unwrap_or_else(|| "DAY".to_string()),
                }
            };

            events.push(Event {
                name: row.try_get("EVENT_NAME").unwrap_or_default(),
                definer: row.try_get("DEFINER").ok(),
                timezone: row.try_get("TIME_ZONE").ok(),
                schedule,
                next_execution: row.try_get::<Option<String>, _>("STARTS").ok().flatten(),
                status: row.try_get("STATUS").ok(),
                on_completion: row.try_get("ON_COMPLETION").ok(),
                body: row.try_get("EVENT_DEFINITION").unwrap_or_default(),
                comment: row
                    .try_get::<Option<String>, _>("EVENT_COMMENT")
                    .ok()
                    .flatten()
                    .filter(|c| !c.is_empty()),
            });
        }

        tracing::debug!("extracted {} events", events.len());
        Ok(events)
    }
}
