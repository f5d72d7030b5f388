//! Snapshot replay against a live database.
//!
//! Objects are applied in a fixed kind order so that every dependency
//! class exists before its dependents: tables, then views, then
//! functions, procedures, triggers and events. Foreign-key checks are
//! disabled for the duration of a real run and re-enabled afterwards,
//! which frees table creation from any intra-kind ordering concern.

pub mod ddl;

use tracing::{debug, info, warn};

use crate::error::{Result, SchemaPortError};
use crate::extract::tables::ensure_guarded;
use crate::gateway::MetadataGateway;
use crate::models::{ImportResult, ObjectKind, Schema, ValidationReport};

/// Options for one replay run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Drop each table, view, trigger and event before creating it. With
    /// this off, an object that already exists on the target fails its
    /// creation statement and is recorded as a failure. Functions and
    /// procedures are always dropped first regardless: the dialect has no
    /// conditional create for routines.
    pub drop_existing: bool,
    /// Plan the run without executing anything. The result lists every
    /// object that a real run would create.
    pub dry_run: bool,
    /// Record per-object failures and keep going instead of aborting on
    /// the first error.
    pub skip_errors: bool,
    pub include_tables: bool,
    pub include_views: bool,
    pub include_functions: bool,
    pub include_procedures: bool,
    pub include_triggers: bool,
    pub include_events: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            drop_existing: false,
            dry_run: false,
            skip_errors: false,
            include_tables: true,
            include_views: true,
            include_functions: true,
            include_procedures: true,
            include_triggers: true,
            include_events: true,
        }
    }
}

impl ImportOptions {
    fn includes(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Table => self.include_tables,
            ObjectKind::View => self.include_views,
            ObjectKind::Function => self.include_functions,
            ObjectKind::Procedure => self.include_procedures,
            ObjectKind::Trigger => self.include_triggers,
            ObjectKind::Event => self.include_events,
        }
    }
}

/// Statements for creating one object: optional drop guards followed by
/// the creation statement itself.
struct PlannedObject {
    name: String,
    statements: Vec<String>,
}

/// Replays [`Schema`] snapshots against the gateway's active database.
pub struct SchemaImporter<'a> {
    gateway: &'a MetadataGateway,
}

impl<'a> SchemaImporter<'a> {
    /// Creates an importer bound to the given gateway session.
    pub fn new(gateway: &'a MetadataGateway) -> Self {
        Self { gateway }
    }

    /// Applies a full snapshot in dependency-kind order.
    pub async fn apply_schema(
        &self,
        schema: &Schema,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let target_db = self.gateway.current_database()?.to_string();
        info!(
            "applying snapshot of '{}' to '{target_db}' ({} objects{})",
            schema.database,
            schema.object_count(),
            if options.dry_run { ", dry run" } else { "" }
        );

        if !options.dry_run {
            self.gateway.execute("SET FOREIGN_KEY_CHECKS = 0").await?;
        }

        let mut result = ImportResult::default();
        let outcome = self
            .apply_kinds(schema, options, &target_db, &mut result)
            .await;

        if !options.dry_run {
            // Best effort: the session must not be left with checks off
            // even when the run is aborting.
            if let Err(error) = self.gateway.execute("SET FOREIGN_KEY_CHECKS = 1").await {
                warn!("failed to re-enable foreign key checks: {error}");
            }
        }

        outcome?;
        info!(
            "import finished: {} created, {} failed",
            result.total_created(),
            result.failures.len()
        );
        Ok(result)
    }

    /// Applies only the base tables of a snapshot.
    pub async fn apply_tables(&self, schema: &Schema, options: &ImportOptions) -> Result<ImportResult> {
        let mut options = options.clone();
        options.include_views = false;
        options.include_functions = false;
        options.include_procedures = false;
        options.include_triggers = false;
        options.include_events = false;
        self.apply_schema(schema, &options).await
    }

    /// Applies only the named tables of a snapshot. Names with no match
    /// in the snapshot are ignored.
    pub async fn apply_specific_tables(
        &self,
        schema: &Schema,
        names: &[String],
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let subset = schema.retain_tables(names);
        self.apply_tables(&subset, options).await
    }

    /// Checks a snapshot for internal consistency, then dry-runs it to
    /// surface statement-planning problems. Nothing is executed.
    pub async fn validate_schema(&self, schema: &Schema) -> Result<ValidationReport> {
        let mut report = ValidationReport {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        for table in &schema.tables {
            for key in &table.foreign_keys {
                if schema.table(&key.referenced_table).is_none() {
                    report.errors.push(format!(
                        "table '{}': foreign key '{}' references '{}' which is not in the snapshot",
                        table.name, key.name, key.referenced_table
                    ));
                }
                if table.column(&key.column).is_none() {
                    report.errors.push(format!(
                        "table '{}': foreign key '{}' names missing column '{}'",
                        table.name, key.name, key.column
                    ));
                }
                if let Some(referenced) = schema.table(&key.referenced_table) {
                    if referenced.column(&key.referenced_column).is_none() {
                        report.errors.push(format!(
                            "table '{}': foreign key '{}' references missing column '{}.{}'",
                            table.name, key.name, key.referenced_table, key.referenced_column
                        ));
                    }
                }
            }
            for index in &table.indexes {
                if index.name != "PRIMARY" && table.column(&index.column).is_none() {
                    report.errors.push(format!(
                        "table '{}': index '{}' names missing column '{}'",
                        table.name, index.name, index.column
                    ));
                }
            }
        }

        for routine in schema.functions.iter().filter(|r| r.returns.is_none()) {
            if !routine.body.trim_start().to_uppercase().starts_with("CREATE") {
                report.warnings.push(format!(
                    "function '{}': no stored creation statement; replay will use a placeholder return type",
                    routine.name
                ));
            }
        }

        let options = ImportOptions {
            dry_run: true,
            skip_errors: true,
            ..ImportOptions::default()
        };
        let dry_run = self.apply_schema(schema, &options).await?;
        for failure in dry_run.failures {
            report.errors.push(format!(
                "{}: {}",
                failure.object, failure.error
            ));
        }

        report.valid = report.errors.is_empty();
        Ok(report)
    }

    /// Replays a snapshot into a different database, creating it first
    /// when needed. Returns the result together with the gateway bound to
    /// the new database.
    pub async fn clone_schema(
        &self,
        schema: &Schema,
        target_db: &str,
        create_missing: bool,
        options: &ImportOptions,
    ) -> Result<(ImportResult, MetadataGateway)> {
        self.ensure_database(schema, target_db, create_missing, options.drop_existing)
            .await?;

        let target = self.gateway.for_database(target_db)?;
        let importer = SchemaImporter::new(&target);
        let result = importer.apply_schema(schema, options).await?;
        Ok((result, target))
    }

    /// Builds a fresh database from a snapshot: the target is created
    /// (or dropped and recreated per the options) and the snapshot is
    /// replayed into it.
    pub async fn create_database(
        &self,
        name: &str,
        schema: &Schema,
        options: &ImportOptions,
    ) -> Result<(ImportResult, MetadataGateway)> {
        self.clone_schema(schema, name, true, options).await
    }

    /// Makes sure the target database exists, honoring the snapshot's
    /// charset and collation when creating it.
    async fn ensure_database(
        &self,
        schema: &Schema,
        name: &str,
        create_missing: bool,
        drop_existing: bool,
    ) -> Result<()> {
        let exists = self.gateway.database_exists(name).await?;
        if exists && !drop_existing {
            return Ok(());
        }
        if !exists && !create_missing {
            return Err(SchemaPortError::precondition(format!(
                "database '{name}' does not exist and creation was not requested"
            )));
        }

        let quoted = crate::ident::quote(name)?;
        if exists {
            info!("dropping existing database '{name}'");
            self.gateway
                .execute(&format!("DROP DATABASE {quoted}"))
                .await?;
        }

        let mut statement = format!("CREATE DATABASE {quoted}");
        if let Some(charset) = &schema.charset {
            statement.push_str(&format!(" CHARACTER SET {charset}"));
        }
        if let Some(collation) = &schema.collation {
            statement.push_str(&format!(" COLLATE {collation}"));
        }
        info!("creating database '{name}'");
        self.gateway.execute(&statement).await?;
        Ok(())
    }

    async fn apply_kinds(
        &self,
        schema: &Schema,
        options: &ImportOptions,
        target_db: &str,
        result: &mut ImportResult,
    ) -> Result<()> {
        for kind in ObjectKind::APPLY_ORDER {
            if !options.includes(kind) {
                continue;
            }
            for (name, batch) in plan_kind(schema, kind, options, target_db) {
                let object = match batch {
                    Ok(statements) => PlannedObject { name, statements },
                    Err(error) => {
                        warn!("cannot plan {kind} '{name}': {error}");
                        result.record_failure(kind, &name, &error.to_string());
                        if !options.skip_errors {
                            return Err(error);
                        }
                        continue;
                    }
                };
                if options.dry_run {
                    debug!("dry run: would create {kind} '{}'", object.name);
                    result.created_mut(kind).push(object.name);
                    continue;
                }
                match self.execute_object(&object).await {
                    Ok(()) => {
                        debug!("created {kind} '{}'", object.name);
                        result.created_mut(kind).push(object.name);
                    }
                    Err(error) => {
                        let error = SchemaPortError::creation_failed(
                            format!("{kind} {}", object.name),
                            error,
                        );
                        warn!("{error}");
                        result.record_failure(kind, &object.name, &error.to_string());
                        if !options.skip_errors {
                            return Err(error);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn execute_object(&self, object: &PlannedObject) -> Result<()> {
        for statement in &object.statements {
            self.gateway.execute(statement).await?;
        }
        Ok(())
    }

}

/// Builds the per-object statement batches for one kind. A batch is the
/// optional drop guard followed by the creation statement; an object whose
/// identifiers fail the naming rules yields an `Err` batch instead.
fn plan_kind(
    schema: &Schema,
    kind: ObjectKind,
    options: &ImportOptions,
    target_db: &str,
) -> Vec<(String, Result<Vec<String>>)> {
    match kind {
        ObjectKind::Table => schema
            .tables
            .iter()
            .map(|table| {
                let batch = batch(kind, &table.name, options.drop_existing, || {
                    Ok(match &table.create_statement {
                        Some(statement) => ensure_guarded(statement),
                        None => ddl::create_table_statement(table)?,
                    })
                });
                (table.name.clone(), batch)
            })
            .collect(),
        ObjectKind::View => schema
            .views
            .iter()
            .map(|view| {
                let batch = batch(kind, &view.name, options.drop_existing, || {
                    ddl::create_view_statement(view, &schema.database, target_db)
                });
                (view.name.clone(), batch)
            })
            .collect(),
        ObjectKind::Function => routine_batches(&schema.functions, kind),
        ObjectKind::Procedure => routine_batches(&schema.procedures, kind),
        ObjectKind::Trigger => schema
            .triggers
            .iter()
            .map(|trigger| {
                let batch = batch(kind, &trigger.name, options.drop_existing, || {
                    ddl::create_trigger_statement(trigger)
                });
                (trigger.name.clone(), batch)
            })
            .collect(),
        ObjectKind::Event => schema
            .events
            .iter()
            .map(|event| {
                let batch = batch(kind, &event.name, options.drop_existing, || {
                    ddl::create_event_statement(event)
                });
                (event.name.clone(), batch)
            })
            .collect(),
    }
}

fn routine_batches(
    routines: &[crate::models::Routine],
    kind: ObjectKind,
) -> Vec<(String, Result<Vec<String>>)> {
    routines
        .iter()
        .map(|routine| {
            let batch = batch(kind, &routine.name, true, || {
                ddl::create_routine_statement(routine)
            });
            (routine.name.clone(), batch)
        })
        .collect()
}

fn batch<F>(kind: ObjectKind, name: &str, drop_first: bool, build: F) -> Result<Vec<String>>
where
    F: FnOnce() -> Result<String>,
{
    let mut statements = Vec::new();
    if drop_first {
        statements.push(ddl::drop_statement(kind, name)?);
    }
    statements.push(build()?);
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventSchedule, Routine, RoutineKind, Trigger, TriggerEvent,
        TriggerTiming, View};

    fn snapshot() -> Schema {
        let mut schema = Schema::new("shop");
        schema.views.push(View {
            name: "active_user".to_string(),
            definition: "select 1".to_string(),
            check_option: None,
            is_updatable: false,
            definer: None,
            security_type: None,
            charset: None,
            collation: None,
        });
        schema.procedures.push(Routine {
            name: "purge".to_string(),
            kind: RoutineKind::Procedure,
            body: "DELETE FROM `log`".to_string(),
            returns: None,
            definer: None,
            created: None,
            modified: None,
            data_access: None,
            deterministic: false,
            security_type: None,
            comment: None,
        });
        schema.triggers.push(Trigger {
            name: "audit".to_string(),
            table: "user".to_string(),
            timing: TriggerTiming::After,
            event: TriggerEvent::Insert,
            statement: "INSERT INTO log VALUES (NEW.id)".to_string(),
            definer: None,
            sql_mode: None,
            created: None,
            charset: None,
            collation: None,
        });
        schema.events.push(Event {
            name: "nightly".to_string(),
            definer: None,
            timezone: None,
            schedule: EventSchedule::Recurring {
                interval_value: "1".to_string(),
                interval_field: "DAY".to_string(),
            },
            next_execution: None,
            status: None,
            on_completion: None,
            body: "CALL purge()".to_string(),
            comment: None,
        });
        schema
    }

    fn statements(schema: &Schema, kind: ObjectKind, options: &ImportOptions) -> Vec<String> {
        let mut planned = plan_kind(schema, kind, options, "shop");
        assert_eq!(planned.len(), 1);
        planned.remove(0).1.unwrap()
    }

    #[test]
    fn views_triggers_events_drop_only_when_requested() {
        let schema = snapshot();
        let keep = ImportOptions::default();

        for kind in [ObjectKind::View, ObjectKind::Trigger, ObjectKind::Event] {
            let batch = statements(&schema, kind, &keep);
            assert_eq!(batch.len(), 1, "{kind} plan must not drop by default");
            assert!(batch[0].starts_with("CREATE"));
        }

        let replace = ImportOptions {
            drop_existing: true,
            ..ImportOptions::default()
        };
        for kind in [ObjectKind::View, ObjectKind::Trigger, ObjectKind::Event] {
            let batch = statements(&schema, kind, &replace);
            assert_eq!(batch.len(), 2);
            assert!(batch[0].starts_with(&format!("DROP {} IF EXISTS", kind.keyword())));
        }
    }

    #[test]
    fn routines_always_drop_first() {
        let schema = snapshot();
        let batch = statements(&schema, ObjectKind::Procedure, &ImportOptions::default());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], "DROP PROCEDURE IF EXISTS `purge`");
    }
}
