//! SQL creation-script export.
//!
//! The script recreates every object in the snapshot: per object a
//! `DROP ... IF EXISTS` guard followed by the creation statement, in the
//! same kind order the importer applies. Routines, triggers and events
//! are wrapped in `DELIMITER` blocks so the script feeds straight into
//! the stock command-line client.

use std::fmt::Write as _;

use crate::error::Result;
use crate::extract::tables::ensure_guarded;
use crate::import::ddl;
use crate::models::{ObjectKind, Schema};

/// Renders the full creation script for a snapshot.
pub fn render(schema: &Schema) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "-- Schema creation script for `{}`", schema.database);
    let _ = writeln!(out, "-- Extracted {}", schema.extracted_at.to_rfc3339());
    if let Some(version) = &schema.server_version {
        let _ = writeln!(out, "-- Server version {version}");
    }
    out.push('\n');
    out.push_str("SET FOREIGN_KEY_CHECKS = 0;\n\n");

    for kind in ObjectKind::APPLY_ORDER {
        render_kind(&mut out, schema, kind)?;
    }

    out.push_str("SET FOREIGN_KEY_CHECKS = 1;\n");
    Ok(out)
}

fn render_kind(out: &mut String, schema: &Schema, kind: ObjectKind) -> Result<()> {
    match kind {
        ObjectKind::Table => {
            for table in &schema.tables {
                let _ = writeln!(out, "-- Table `{}`", table.name);
                let _ = writeln!(out, "{};", ddl::drop_statement(kind, &table.name)?);
                let create = match &table.create_statement {
                    Some(statement) => ensure_guarded(statement),
                    None => ddl::create_table_statement(table)?,
                };
                let _ = writeln!(out, "{create};\n");
            }
        }
        ObjectKind::View => {
            for view in &schema.views {
                let _ = writeln!(out, "-- View `{}`", view.name);
                let _ = writeln!(out, "{};", ddl::drop_statement(kind, &view.name)?);
                let create =
                    ddl::create_view_statement(view, &schema.database, &schema.database)?;
                let _ = writeln!(out, "{create};\n");
            }
        }
        ObjectKind::Function | ObjectKind::Procedure => {
            let routines = if kind == ObjectKind::Function {
                &schema.functions
            } else {
                &schema.procedures
            };
            for routine in routines {
                let _ = writeln!(out, "-- {} `{}`", kind.keyword(), routine.name);
                let _ = writeln!(out, "{};", ddl::drop_statement(kind, &routine.name)?);
                delimited(out, &ddl::create_routine_statement(routine)?);
            }
        }
        ObjectKind::Trigger => {
            for trigger in &schema.triggers {
                let _ = writeln!(out, "-- Trigger `{}`", trigger.name);
                let _ = writeln!(out, "{};", ddl::drop_statement(kind, &trigger.name)?);
                delimited(out, &ddl::create_trigger_statement(trigger)?);
            }
        }
        ObjectKind::Event => {
            for event in &schema.events {
                let _ = writeln!(out, "-- Event `{}`", event.name);
                let _ = writeln!(out, "{};", ddl::drop_statement(kind, &event.name)?);
                delimited(out, &ddl::create_event_statement(event)?);
            }
        }
    }
    Ok(())
}

/// Wraps a statement whose body may contain semicolons in a `DELIMITER`
/// block.
fn delimited(out: &mut String, statement: &str) {
    let _ = writeln!(out, "DELIMITER ;;");
    let _ = writeln!(out, "{statement};;");
    let _ = writeln!(out, "DELIMITER ;\n");
}
