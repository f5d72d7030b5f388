//! Markdown reference-documentation export.

use std::fmt::Write as _;

use crate::import::ddl::grouped_indexes;
use crate::models::{Schema, Table};

/// Renders human-readable reference documentation for a snapshot.
pub fn render(schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Database `{}`", schema.database);
    out.push('\n');
    if let Some(version) = &schema.server_version {
        let _ = writeln!(out, "- Server version: {version}");
    }
    if let Some(charset) = &schema.charset {
        let _ = writeln!(out, "- Character set: {charset}");
    }
    if let Some(collation) = &schema.collation {
        let _ = writeln!(out, "- Collation: {collation}");
    }
    let _ = writeln!(out, "- Extracted: {}", schema.extracted_at.to_rfc3339());
    let _ = writeln!(out, "- Objects: {}", schema.object_count());

    if !schema.tables.is_empty() {
        let _ = writeln!(out, "\n## Tables");
        for table in &schema.tables {
            render_table(&mut out, table);
        }
    }

    if !schema.views.is_empty() {
        let _ = writeln!(out, "\n## Views");
        for view in &schema.views {
            let _ = writeln!(out, "\n### `{}`", view.name);
            let _ = writeln!(out, "\n```sql\n{}\n```", view.definition);
            if view.is_updatable {
                let _ = writeln!(out, "\nUpdatable.");
            }
        }
    }

    render_routines(&mut out, "Functions", &schema.functions);
    render_routines(&mut out, "Procedures", &schema.procedures);

    if !schema.triggers.is_empty() {
        let _ = writeln!(out, "\n## Triggers");
        let _ = writeln!(out, "\n| Name | Table | Fires | Statement |");
        let _ = writeln!(out, "| --- | --- | --- | --- |");
        for trigger in &schema.triggers {
            let _ = writeln!(
                out,
                "| `{}` | `{}` | {} {} | {} |",
                trigger.name,
                trigger.table,
                trigger.timing.as_sql(),
                trigger.event.as_sql(),
                cell(&trigger.statement)
            );
        }
    }

    if !schema.events.is_empty() {
        let _ = writeln!(out, "\n## Events");
        for event in &schema.events {
            let _ = writeln!(out, "\n### `{}`", event.name);
            if let Some(status) = &event.status {
                let _ = writeln!(out, "\nStatus: {status}");
            }
            let _ = writeln!(out, "\n```sql\n{}\n```", event.body);
        }
    }

    out
}

fn render_table(out: &mut String, table: &Table) {
    let _ = writeln!(out, "\n### `{}`", table.name);
    if let Some(comment) = &table.comment {
        let _ = writeln!(out, "\n{comment}");
    }
    if let Some(engine) = &table.engine {
        let _ = writeln!(out, "\nEngine: {engine}");
    }

    let _ = writeln!(out, "\n| Column | Type | Nullable | Default | Extra |");
    let _ = writeln!(out, "| --- | --- | --- | --- | --- |");
    for column in &table.columns {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | {} | {} | {} |",
            column.name,
            column.column_type,
            if column.nullable { "yes" } else { "no" },
            column.default.as_deref().map_or(String::new(), |d| cell(d)),
            cell(&column.extra)
        );
    }

    let indexes = grouped_indexes(&table.indexes);
    if !indexes.is_empty() {
        let _ = writeln!(out, "\nIndexes:");
        for (name, unique, columns) in indexes {
            let _ = writeln!(
                out,
                "- `{name}`{} ({})",
                if unique { " (unique)" } else { "" },
                columns.join(", ")
            );
        }
    }

    if !table.foreign_keys.is_empty() {
        let _ = writeln!(out, "\nForeign keys:");
        for key in &table.foreign_keys {
            let _ = writeln!(
                out,
                "- `{}`: `{}` references `{}`.`{}` (on update {}, on delete {})",
                key.name,
                key.column,
                key.referenced_table,
                key.referenced_column,
                key.on_update.as_sql(),
                key.on_delete.as_sql()
            );
        }
    }
}

fn render_routines(out: &mut String, heading: &str, routines: &[crate::models::Routine]) {
    if routines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## {heading}");
    for routine in routines {
        let _ = writeln!(out, "\n### `{}`", routine.name);
        if let Some(returns) = &routine.returns {
            let _ = writeln!(out, "\nReturns `{returns}`.");
        }
        if let Some(comment) = &routine.comment {
            let _ = writeln!(out, "\n{comment}");
        }
        let _ = writeln!(out, "\n```sql\n{}\n```", routine.body);
    }
}

/// Flattens a value for a Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
