//! TypeScript type-declaration export.
//!
//! Emits one interface per base table describing the row shape an
//! application sees. Nullable columns become optional properties; the
//! dialect's type strings map onto the small set of TypeScript primitives
//! a driver actually returns.

use std::fmt::Write as _;

use crate::models::{Column, Schema, Table};

/// Renders type declarations for every base table in the snapshot.
pub fn render(schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// Type declarations for database `{}`",
        schema.database
    );
    let _ = writeln!(out, "// Generated {}", schema.extracted_at.to_rfc3339());

    for table in &schema.tables {
        out.push('\n');
        render_table(&mut out, table);
    }
    out
}

fn render_table(out: &mut String, table: &Table) {
    if let Some(comment) = &table.comment {
        let _ = writeln!(out, "/** {comment} */");
    }
    let _ = writeln!(out, "export interface {} {{", interface_name(&table.name));
    for column in &table.columns {
        if let Some(comment) = &column.comment {
            let _ = writeln!(out, "  /** {comment} */");
        }
        let marker = if column.nullable { "?" } else { "" };
        let _ = writeln!(
            out,
            "  {}{marker}: {};",
            property_name(&column.name),
            script_type(&column.column_type)
        );
    }
    let _ = writeln!(out, "}}");
}

/// `order_item` becomes `OrderItem`; names that are already camel-cased
/// keep their interior capitals.
fn interface_name(table: &str) -> String {
    table
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Column names are emitted as-is, quoted when they are not valid
/// TypeScript identifiers.
fn property_name(column: &str) -> String {
    let plain = column
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c == '$' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    if plain && !column.is_empty() {
        column.to_string()
    } else {
        format!("'{column}'")
    }
}

/// Maps a dialect type string onto its TypeScript counterpart.
fn script_type(column_type: &str) -> String {
    let lowered = column_type.to_lowercase();
    // "bigint(20) unsigned" reduces to "bigint".
    let base = lowered.split(['(', ' ']).next().unwrap_or(&lowered).trim();

    // tinyint(1) is the dialect's boolean idiom.
    if lowered.starts_with("tinyint(1)") || base == "bool" || base == "boolean" {
        return "boolean".to_string();
    }
    // Members are sliced from the original string: enum values are
    // case-sensitive data, not keywords.
    if base == "enum" || base == "set" {
        return enum_union(column_type);
    }
    match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "decimal"
        | "numeric" | "float" | "double" | "bit" => "number".to_string(),
        "date" | "datetime" | "timestamp" | "time" | "year" => "Date | string".to_string(),
        "json" => "any".to_string(),
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            "Buffer".to_string()
        }
        _ => "string".to_string(),
    }
}

/// `enum('a','b')` becomes the literal union `'a' | 'b'`.
fn enum_union(column_type: &str) -> String {
    let Some(open) = column_type.find('(') else {
        return "string".to_string();
    };
    let Some(close) = column_type.rfind(')') else {
        return "string".to_string();
    };
    let members: Vec<&str> = column_type[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect();
    if members.is_empty() {
        "string".to_string()
    } else {
        members.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKey;

    fn column(name: &str, ty: &str, nullable: bool) -> Column {
        Column {
            name: name.to_string(),
            column_type: ty.to_string(),
            nullable,
            default: None,
            extra: String::new(),
            comment: None,
            charset: None,
            collation: None,
            key: ColumnKey::None,
        }
    }

    #[test]
    fn table_maps_to_interface() {
        let mut schema = Schema::new("shop");
        schema.tables.push(Table {
            name: "order_item".to_string(),
            columns: vec![
                column("id", "int", false),
                column("note", "varchar(255)", true),
                column("active", "tinyint(1)", false),
                column("status", "enum('New','Shipped')", false),
                column("placed_at", "datetime", false),
                column("payload", "blob", true),
            ],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            collation: None,
            comment: None,
            create_statement: None,
        });

        let rendered = render(&schema);
        assert!(rendered.contains("export interface OrderItem {"));
        assert!(rendered.contains("  id: number;"));
        assert!(rendered.contains("  note?: string;"));
        assert!(rendered.contains("  active: boolean;"));
        assert!(rendered.contains("  status: 'New' | 'Shipped';"));
        assert!(rendered.contains("  placed_at: Date | string;"));
        assert!(rendered.contains("  payload?: Buffer;"));
    }

    #[test]
    fn awkward_column_names_are_quoted() {
        assert_eq!(property_name("valid_name"), "valid_name");
        assert_eq!(property_name("2fa"), "'2fa'");
        assert_eq!(property_name("with space"), "'with space'");
    }

    #[test]
    fn unknown_types_fall_back_to_string() {
        assert_eq!(script_type("geometry"), "string");
        assert_eq!(script_type("varchar(64)"), "string");
        assert_eq!(script_type("bigint unsigned"), "number");
    }

    #[test]
    fn enum_members_keep_their_case() {
        assert_eq!(script_type("enum('New','Shipped')"), "'New' | 'Shipped'");
        assert_eq!(script_type("ENUM('a','B')"), "'a' | 'B'");
        assert_eq!(script_type("set('Read','Write')"), "'Read' | 'Write'");
    }
}
