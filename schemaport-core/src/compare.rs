//! Structural comparison of two schema snapshots.
//!
//! Pure and name-keyed: tables and columns are diffed through hash lookups,
//! O(tables + columns) overall. A column present in both snapshots counts
//! as modified when any field differs; there is no per-field granularity.
//! Views are diffed by name existence and exact definition text.

use std::collections::HashMap;

use crate::models::{Schema, SchemaComparison, Table, TableDiff};

/// Compares two snapshots, reporting what `new` adds, removes and changes
/// relative to `old`. `compare_schemas(s, s)` is empty for any `s`.
pub fn compare_schemas(old: &Schema, new: &Schema) -> SchemaComparison {
    let old_tables: HashMap<&str, &Table> =
        old.tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let new_tables: HashMap<&str, &Table> =
        new.tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut comparison = SchemaComparison::default();

    for table in &new.tables {
        if !old_tables.contains_key(table.name.as_str()) {
            comparison.added_tables.push(table.name.clone());
        }
    }
    for table in &old.tables {
        match new_tables.get(table.name.as_str()) {
            None => comparison.removed_tables.push(table.name.clone()),
            Some(new_table) => {
                let diff = diff_table(table, new_table);
                if !diff.is_empty() {
                    comparison.modified_tables.push(diff);
                }
            }
        }
    }

    let old_views: HashMap<&str, &str> = old
        .views
        .iter()
        .map(|v| (v.name.as_str(), v.definition.as_str()))
        .collect();
    let new_views: HashMap<&str, &str> = new
        .views
        .iter()
        .map(|v| (v.name.as_str(), v.definition.as_str()))
        .collect();

    for view in &new.views {
        if !old_views.contains_key(view.name.as_str()) {
            comparison.added_views.push(view.name.clone());
        }
    }
    for view in &old.views {
        match new_views.get(view.name.as_str()) {
            None => comparison.removed_views.push(view.name.clone()),
            // Exact-string comparison of the defining body, case- and
            // whitespace-sensitive.
            Some(new_definition) if *new_definition != view.definition => {
                comparison.modified_views.push(view.name.clone());
            }
            Some(_) => {}
        }
    }

    comparison
}

/// Column-level diff of one table present in both snapshots.
fn diff_table(old: &Table, new: &Table) -> TableDiff {
    let old_columns: HashMap<&str, &crate::models::Column> =
        old.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let new_columns: HashMap<&str, &crate::models::Column> =
        new.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut diff = TableDiff {
        name: old.name.clone(),
        ..TableDiff::default()
    };

    for column in &new.columns {
        if !old_columns.contains_key(column.name.as_str()) {
            diff.added_columns.push(column.name.clone());
        }
    }
    for column in &old.columns {
        match new_columns.get(column.name.as_str()) {
            None => diff.removed_columns.push(column.name.clone()),
            Some(new_column) if *new_column != column => {
                diff.modified_columns.push(column.name.clone());
            }
            Some(_) => {}
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnKey, View};

    fn column(name: &str, ty: &str) -> Column {
        Column {
            name: name.to_string(),
            column_type: ty.to_string(),
            nullable: false,
            default: None,
            extra: String::new(),
            comment: None,
            charset: None,
            collation: None,
            key: ColumnKey::None,
        }
    }

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table {
            name: name.to_string(),
            columns,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            collation: None,
            comment: None,
            create_statement: None,
        }
    }

    fn schema_with(tables: Vec<Table>, views: Vec<View>) -> Schema {
        let mut schema = Schema::new("shop");
        schema.tables = tables;
        schema.views = views;
        schema
    }

    fn view(name: &str, definition: &str) -> View {
        View {
            name: name.to_string(),
            definition: definition.to_string(),
            check_option: None,
            is_updatable: false,
            definer: None,
            security_type: None,
            charset: None,
            collation: None,
        }
    }

    #[test]
    fn identical_schemas_diff_empty() {
        let schema = schema_with(
            vec![table("user", vec![column("id", "int"), column("email", "varchar(255)")])],
            vec![view("v", "select 1")],
        );
        let comparison = compare_schemas(&schema, &schema.clone());
        assert!(comparison.is_empty());
    }

    #[test]
    fn added_and_removed_tables_by_name_set() {
        let old = schema_with(vec![table("user", vec![column("id", "int")])], Vec::new());
        let new = schema_with(vec![table("order", vec![column("id", "int")])], Vec::new());
        let comparison = compare_schemas(&old, &new);
        assert_eq!(comparison.added_tables, vec!["order"]);
        assert_eq!(comparison.removed_tables, vec!["user"]);
        assert!(comparison.modified_tables.is_empty());
    }

    #[test]
    fn removed_column_reported_on_exactly_one_table() {
        let old = schema_with(
            vec![table("user", vec![column("id", "int"), column("email", "varchar(255)")])],
            Vec::new(),
        );
        let mut new = old.clone();
        new.tables[0].columns.retain(|c| c.name != "email");

        let comparison = compare_schemas(&old, &new);
        assert_eq!(comparison.modified_tables.len(), 1);
        let diff = &comparison.modified_tables[0];
        assert_eq!(diff.name, "user");
        assert_eq!(diff.removed_columns, vec!["email"]);
        assert!(diff.added_columns.is_empty());
    }

    #[test]
    fn any_field_change_marks_column_modified() {
        let old = schema_with(vec![table("user", vec![column("id", "int")])], Vec::new());
        let mut new = old.clone();
        new.tables[0].columns[0].comment = Some("surrogate key".to_string());

        let comparison = compare_schemas(&old, &new);
        assert_eq!(comparison.modified_tables[0].modified_columns, vec!["id"]);
    }

    #[test]
    fn view_body_diff_is_whitespace_sensitive() {
        let old = schema_with(Vec::new(), vec![view("v", "select 1")]);
        let new = schema_with(Vec::new(), vec![view("v", "select  1")]);
        let comparison = compare_schemas(&old, &new);
        assert_eq!(comparison.modified_views, vec!["v"]);
    }
}
