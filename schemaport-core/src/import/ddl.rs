//! DDL synthesis for snapshot replay.
//!
//! Tables prefer the stored creation statement; these builders cover every
//! object kind for the cases where only structured fields are available,
//! plus the drop guards and the cross-database view-body rewrite.

use std::fmt::Write as _;

use regex::Regex;

use crate::error::Result;
use crate::ident;
use crate::models::{
    Column, ColumnKey, Event, EventSchedule, ForeignKey, Index, ObjectKind, Routine, RoutineKind,
    Table, Trigger, View,
};

/// `DROP <KIND> IF EXISTS` guard for one object.
pub fn drop_statement(kind: ObjectKind, name: &str) -> Result<String> {
    Ok(format!(
        "DROP {} IF EXISTS {}",
        kind.keyword(),
        ident::quote(name)?
    ))
}

/// Escapes a string literal for embedding in DDL text.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// One column definition line.
fn column_definition(column: &Column) -> Result<String> {
    let mut line = format!("{} {}", ident::quote(&column.name)?, column.column_type);

    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        if default == "NULL" {
            line.push_str(" DEFAULT NULL");
        } else if default.to_uppercase().starts_with("CURRENT_TIMESTAMP") {
            let _ = write!(line, " DEFAULT {default}");
        } else {
            let _ = write!(line, " DEFAULT '{}'", escape_literal(default));
        }
    }
    if !column.extra.is_empty() {
        let _ = write!(line, " {}", column.extra);
    }
    if let Some(comment) = &column.comment {
        let _ = write!(line, " COMMENT '{}'", escape_literal(comment));
    }

    Ok(line)
}

/// Groups flat index entries into whole indexes, preserving first-seen
/// order and intra-index column order (entries arrive sorted by seq).
pub fn grouped_indexes(indexes: &[Index]) -> Vec<(String, bool, Vec<String>)> {
    let mut groups: Vec<(String, bool, Vec<String>)> = Vec::new();
    for entry in indexes {
        match groups.iter_mut().find(|(name, _, _)| *name == entry.name) {
            Some((_, _, columns)) => columns.push(entry.column.clone()),
            None => groups.push((entry.name.clone(), entry.unique, vec![entry.column.clone()])),
        }
    }
    groups
}

/// Groups flat foreign-key entries into whole constraints by name.
fn grouped_foreign_keys(keys: &[ForeignKey]) -> Vec<(&ForeignKey, Vec<String>, Vec<String>)> {
    let mut groups: Vec<(&ForeignKey, Vec<String>, Vec<String>)> = Vec::new();
    for entry in keys {
        match groups.iter_mut().find(|(first, _, _)| first.name == entry.name) {
            Some((_, columns, referenced)) => {
                columns.push(entry.column.clone());
                referenced.push(entry.referenced_column.clone());
            }
            None => groups.push((
                entry,
                vec![entry.column.clone()],
                vec![entry.referenced_column.clone()],
            )),
        }
    }
    groups
}

fn quoted_list(names: &[String]) -> Result<String> {
    let quoted: Result<Vec<String>> = names.iter().map(|n| ident::quote(n)).collect();
    Ok(quoted?.join(", "))
}

/// Synthesizes a guarded creation statement from a table's structured
/// fields. Used when no verbatim statement was captured at extraction.
pub fn create_table_statement(table: &Table) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    for column in &table.columns {
        lines.push(column_definition(column)?);
    }

    let primary: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.key == ColumnKey::Primary)
        .map(|c| c.name.clone())
        .collect();
    if !primary.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", quoted_list(&primary)?));
    }

    for (name, unique, columns) in grouped_indexes(&table.indexes) {
        // The primary key is emitted from the column roles above.
        if name == "PRIMARY" {
            continue;
        }
        let keyword = if unique { "UNIQUE KEY" } else { "KEY" };
        lines.push(format!(
            "{keyword} {} ({})",
            ident::quote(&name)?,
            quoted_list(&columns)?
        ));
    }

    for (key, columns, referenced) in grouped_foreign_keys(&table.foreign_keys) {
        lines.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            ident::quote(&key.name)?,
            quoted_list(&columns)?,
            ident::quote(&key.referenced_table)?,
            quoted_list(&referenced)?,
            key.on_update.as_sql(),
            key.on_delete.as_sql(),
        ));
    }

    let mut statement = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        ident::quote(&table.name)?,
        lines.join(",\n  ")
    );
    if let Some(engine) = &table.engine {
        let _ = write!(statement, " ENGINE={engine}");
    }
    if let Some(collation) = &table.collation {
        let _ = write!(statement, " COLLATE={collation}");
    }
    if let Some(comment) = &table.comment {
        let _ = write!(statement, " COMMENT='{}'", escape_literal(comment));
    }

    Ok(statement)
}

/// Rewrites qualified table references inside a view body from the source
/// database to the target, covering both the backtick-quoted and bare
/// dotted forms.
pub fn rewrite_qualified_references(body: &str, source_db: &str, target_db: &str) -> String {
    let rewritten = body.replace(&format!("`{source_db}`."), &format!("`{target_db}`."));

    let bare_form = Regex::new(&format!(r"\b{}\.", regex::escape(source_db)))
        .expect("escaped database name is a valid pattern");
    bare_form
        .replace_all(&rewritten, format!("{target_db}."))
        .into_owned()
}

/// Creation statement for a view. When the source schema's database name
/// differs from the target, qualified references inside the body are
/// rewritten first.
pub fn create_view_statement(view: &View, source_db: &str, target_db: &str) -> Result<String> {
    let body = if source_db == target_db {
        view.definition.clone()
    } else {
        rewrite_qualified_references(&view.definition, source_db, target_db)
    };
    Ok(format!("CREATE VIEW {} AS {body}", ident::quote(&view.name)?))
}

/// Creation statement for a routine. A stored body that already begins
/// with a creation keyword is used verbatim; a bare body is wrapped in a
/// minimal creation header (functions get a placeholder return type when
/// none was captured).
pub fn create_routine_statement(routine: &Routine) -> Result<String> {
    let trimmed = routine.body.trim_start();
    if trimmed.to_uppercase().starts_with("CREATE") {
        return Ok(routine.body.clone());
    }

    let name = ident::quote(&routine.name)?;
    let statement = match routine.kind {
        RoutineKind::Function => {
            let returns = routine.returns.as_deref().unwrap_or("varchar(255)");
            format!(
                "CREATE FUNCTION {name}() RETURNS {returns}\nBEGIN\n{}\nEND",
                routine.body
            )
        }
        RoutineKind::Procedure => {
            format!("CREATE PROCEDURE {name}()\nBEGIN\n{}\nEND", routine.body)
        }
    };
    Ok(statement)
}

/// Creation statement for a trigger.
pub fn create_trigger_statement(trigger: &Trigger) -> Result<String> {
    Ok(format!(
        "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
        ident::quote(&trigger.name)?,
        trigger.timing.as_sql(),
        trigger.event.as_sql(),
        ident::quote(&trigger.table)?,
        trigger.statement
    ))
}

/// Creation statement for a scheduled event. One-time schedules render as
/// a fixed timestamp, recurring schedules as an interval expression.
pub fn create_event_statement(event: &Event) -> Result<String> {
    let schedule = match &event.schedule {
        EventSchedule::OneTime { execute_at } => {
            format!("AT '{}'", escape_literal(execute_at))
        }
        EventSchedule::Recurring {
            interval_value,
            interval_field,
        } => format!("EVERY {interval_value} {interval_field}"),
    };
    Ok(format!(
        "CREATE EVENT {} ON SCHEDULE {schedule} DO {}",
        ident::quote(&event.name)?,
        event.body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferentialAction;

    fn column(name: &str, ty: &str, key: ColumnKey) -> Column {
        Column {
            name: name.to_string(),
            column_type: ty.to_string(),
            nullable: false,
            default: None,
            extra: String::new(),
            comment: None,
            charset: None,
            collation: None,
            key,
        }
    }

    fn index(name: &str, column: &str, seq: u32, unique: bool) -> Index {
        Index {
            name: name.to_string(),
            table: "user".to_string(),
            column: column.to_string(),
            seq_in_index: seq,
            unique,
            index_type: Some("BTREE".to_string()),
            cardinality: None,
            comment: None,
        }
    }

    #[test]
    fn synthesized_table_has_pk_index_and_fk_clauses() {
        let table = Table {
            name: "order_item".to_string(),
            columns: vec![
                column("id", "int", ColumnKey::Primary),
                column("order_id", "int", ColumnKey::Indexed),
            ],
            indexes: vec![index("idx_order", "order_id", 1, false)],
            foreign_keys: vec![ForeignKey {
                name: "fk_order".to_string(),
                table: "order_item".to_string(),
                column: "order_id".to_string(),
                referenced_table: "order".to_string(),
                referenced_column: "id".to_string(),
                on_update: ReferentialAction::Restrict,
                on_delete: ReferentialAction::Cascade,
            }],
            engine: Some("InnoDB".to_string()),
            collation: None,
            comment: None,
            create_statement: None,
        };

        let sql = create_table_statement(&table).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `order_item`"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("KEY `idx_order` (`order_id`)"));
        assert!(sql.contains(
            "CONSTRAINT `fk_order` FOREIGN KEY (`order_id`) REFERENCES `order` (`id`) ON UPDATE RESTRICT ON DELETE CASCADE"
        ));
        assert!(sql.ends_with("ENGINE=InnoDB"));
    }

    #[test]
    fn composite_unique_index_merges_by_name() {
        let entries = vec![
            index("uq_pair", "a", 1, true),
            index("uq_pair", "b", 2, true),
            index("idx_c", "c", 1, false),
        ];
        let groups = grouped_indexes(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "uq_pair");
        assert!(groups[0].1);
        assert_eq!(groups[0].2, vec!["a", "b"]);
    }

    #[test]
    fn view_rewrite_covers_both_reference_forms() {
        let body = "select `shop`.`user`.id, shop.order.total from `shop`.`user`";
        let rewritten = rewrite_qualified_references(body, "shop", "shop_clone");
        assert_eq!(
            rewritten,
            "select `shop_clone`.`user`.id, shop_clone.order.total from `shop_clone`.`user`"
        );
    }

    #[test]
    fn view_rewrite_leaves_other_names_alone() {
        let body = "select * from workshop.parts";
        assert_eq!(
            rewrite_qualified_references(body, "shop", "shop2"),
            "select * from workshop.parts"
        );
    }

    #[test]
    fn bare_routine_body_gets_wrapped() {
        let routine = Routine {
            name: "total".to_string(),
            kind: RoutineKind::Function,
            body: "RETURN 1;".to_string(),
            returns: Some("int".to_string()),
            definer: None,
            created: None,
            modified: None,
            data_access: None,
            deterministic: true,
            security_type: None,
            comment: None,
        };
        let sql = create_routine_statement(&routine).unwrap();
        assert!(sql.starts_with("CREATE FUNCTION `total`() RETURNS int"));
        assert!(sql.contains("BEGIN\nRETURN 1;\nEND"));
    }

    #[test]
    fn full_creation_body_used_verbatim() {
        let routine = Routine {
            name: "noop".to_string(),
            kind: RoutineKind::Procedure,
            body: "CREATE PROCEDURE `noop`() BEGIN END".to_string(),
            returns: None,
            definer: None,
            created: None,
            modified: None,
            data_access: None,
            deterministic: false,
            security_type: None,
            comment: None,
        };
        assert_eq!(
            create_routine_statement(&routine).unwrap(),
            "CREATE PROCEDURE `noop`() BEGIN END"
        );
    }

    #[test]
    fn event_schedules_render_by_kind() {
        let mut event = Event {
            name: "purge".to_string(),
            definer: None,
            timezone: None,
            schedule: EventSchedule::OneTime {
                execute_at: "2026-01-01 00:00:00".to_string(),
            },
            next_execution: None,
            status: None,
            on_completion: None,
            body: "DELETE FROM log".to_string(),
            comment: None,
        };
        assert!(
            create_event_statement(&event)
                .unwrap()
                .contains("ON SCHEDULE AT '2026-01-01 00:00:00'")
        );

        event.schedule = EventSchedule::Recurring {
            interval_value: "1".to_string(),
            interval_field: "DAY".to_string(),
        };
        assert!(
            create_event_statement(&event)
                .unwrap()
                .contains("ON SCHEDULE EVERY 1 DAY")
        );
    }
}
