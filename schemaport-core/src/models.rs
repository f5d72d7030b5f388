//! Core data models for schema snapshots.
//!
//! A [`Schema`] is the aggregate root produced by one extraction run (or one
//! interchange deserialization). Every entity below is a plain value record:
//! once built it is never mutated in place, and all of them serialize
//! losslessly through serde for the interchange format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interchange document version stamped into every snapshot.
pub const FORMAT_VERSION: &str = "1.0";

/// The role a column plays in the table's keys, from the catalog's
/// `COLUMN_KEY` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColumnKey {
    /// Part of the primary key (`PRI`).
    Primary,
    /// First column of a unique index (`UNI`).
    Unique,
    /// First column of a non-unique index (`MUL`).
    Indexed,
    /// No key participation.
    #[default]
    None,
}

impl ColumnKey {
    /// Parses the catalog's `COLUMN_KEY` value.
    pub fn from_catalog(value: &str) -> Self {
        match value {
            "PRI" => Self::Primary,
            "UNI" => Self::Unique,
            "MUL" => Self::Indexed,
            _ => Self::None,
        }
    }
}

/// Referential action attached to a foreign key rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    /// The dialect's default when the catalog reports no rule.
    #[default]
    Restrict,
    NoAction,
}

impl ReferentialAction {
    /// Parses a catalog rule string, defaulting to `RESTRICT` when the rule
    /// is absent or unrecognized.
    pub fn from_catalog(rule: Option<&str>) -> Self {
        match rule.map(str::to_uppercase).as_deref() {
            Some("CASCADE") => Self::Cascade,
            Some("SET NULL") => Self::SetNull,
            Some("SET DEFAULT") => Self::SetDefault,
            Some("NO ACTION") => Self::NoAction,
            _ => Self::Restrict,
        }
    }

    /// The SQL spelling used when regenerating constraint clauses.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A single table column, ordinal-ordered within its table.
///
/// `column_type` is the raw dialect type string (e.g. `varchar(255)`,
/// `enum('a','b')`), preserved verbatim so creation statements can be
/// regenerated without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    /// `None` means no default; `Some("NULL")` is an explicit NULL default.
    pub default: Option<String>,
    /// Extra modifiers (`auto_increment`, `on update CURRENT_TIMESTAMP`, ...).
    pub extra: String,
    pub comment: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub key: ColumnKey,
}

/// One catalog row of an index: a single (column, position) entry.
///
/// Composite indexes appear as multiple entries sharing a `name`, ordered by
/// `seq_in_index`. Consumers that need whole indexes group by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub column: String,
    pub seq_in_index: u32,
    pub unique: bool,
    pub index_type: Option<String>,
    pub cardinality: Option<i64>,
    pub comment: Option<String>,
}

/// A single-column foreign key rule with its referential actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
}

/// A base table with its columns, indexes and foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    /// Verbatim guarded creation statement from the server. When present it
    /// is the authoritative replay source; the column/index/key lists are
    /// used to synthesize one only when it is absent.
    pub create_statement: Option<String>,
}

impl Table {
    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary-key columns, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.key == ColumnKey::Primary)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// A view and its defining body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub definition: String,
    pub check_option: Option<String>,
    pub is_updatable: bool,
    pub definer: Option<String>,
    pub security_type: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// Whether a routine is a stored function or a stored procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineKind {
    Function,
    Procedure,
}

impl RoutineKind {
    /// The SQL keyword for this routine kind.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

/// A stored function or procedure.
///
/// `body` is the full creation statement when the server's `SHOW CREATE`
/// call succeeded during extraction, otherwise the bare routine body from
/// the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub kind: RoutineKind,
    pub body: String,
    /// Declared return type; `None` for procedures.
    pub returns: Option<String>,
    pub definer: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub data_access: Option<String>,
    pub deterministic: bool,
    pub security_type: Option<String>,
    pub comment: Option<String>,
}

/// When a trigger fires relative to the row operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    Before,
    After,
}

impl TriggerTiming {
    pub fn from_catalog(value: &str) -> Self {
        if value.eq_ignore_ascii_case("AFTER") {
            Self::After
        } else {
            Self::Before
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

/// The row operation a trigger fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn from_catalog(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Insert,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A table trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub statement: String,
    pub definer: Option<String>,
    pub sql_mode: Option<String>,
    pub created: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// Schedule of a server event: either a one-shot timestamp or a recurring
/// interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventSchedule {
    OneTime {
        execute_at: String,
    },
    Recurring {
        interval_value: String,
        interval_field: String,
    },
}

/// A scheduled server event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub definer: Option<String>,
    pub timezone: Option<String>,
    pub schedule: EventSchedule,
    /// Informational only; the target server recomputes it on replay.
    pub next_execution: Option<String>,
    pub status: Option<String>,
    pub on_completion: Option<String>,
    pub body: String,
    pub comment: Option<String>,
}

/// Complete logical schema of one database: the aggregate root.
///
/// Object names are unique within their own kind collection; collection
/// order is the extraction order (name-sorted by the catalog queries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub format_version: String,
    pub database: String,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub server_version: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub functions: Vec<Routine>,
    pub procedures: Vec<Routine>,
    pub triggers: Vec<Trigger>,
    pub events: Vec<Event>,
}

impl Schema {
    /// Creates an empty snapshot for the named database, stamped now.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            database: database.into(),
            charset: None,
            collation: None,
            server_version: None,
            extracted_at: Utc::now(),
            tables: Vec::new(),
            views: Vec::new(),
            functions: Vec::new(),
            procedures: Vec::new(),
            triggers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Looks a table up by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Total number of schema objects across all kinds.
    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.functions.len()
            + self.procedures.len()
            + self.triggers.len()
            + self.events.len()
    }

    /// A copy containing only the named tables, with every other kind
    /// collection cleared. Unknown names are silently ignored.
    pub fn retain_tables(&self, names: &[String]) -> Self {
        let mut filtered = self.clone();
        filtered.tables.retain(|t| names.contains(&t.name));
        filtered.views.clear();
        filtered.functions.clear();
        filtered.procedures.clear();
        filtered.triggers.clear();
        filtered.events.clear();
        filtered
    }
}

/// The kinds of schema object a snapshot can hold, in dependency-safe
/// replay order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    View,
    Function,
    Procedure,
    Trigger,
    Event,
}

impl ObjectKind {
    /// Replay order: tables first because every other kind may reference
    /// them, routines before triggers and events which may call them.
    pub const APPLY_ORDER: [ObjectKind; 6] = [
        ObjectKind::Table,
        ObjectKind::View,
        ObjectKind::Function,
        ObjectKind::Procedure,
        ObjectKind::Trigger,
        ObjectKind::Event,
    ];

    /// The SQL object keyword (`TABLE`, `VIEW`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Trigger => "TRIGGER",
            Self::Event => "EVENT",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Function => "function",
            Self::Procedure => "procedure",
            Self::Trigger => "trigger",
            Self::Event => "event",
        };
        write!(f, "{label}")
    }
}

/// Per-table detail of a schema comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableDiff {
    pub name: String,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    pub modified_columns: Vec<String>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
    }
}

/// Structural diff between two snapshots. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SchemaComparison {
    pub added_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub modified_tables: Vec<TableDiff>,
    pub added_views: Vec<String>,
    pub removed_views: Vec<String>,
    pub modified_views: Vec<String>,
}

impl SchemaComparison {
    /// True when the two snapshots were structurally identical.
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
            && self.added_views.is_empty()
            && self.removed_views.is_empty()
            && self.modified_views.is_empty()
    }
}

/// One object that failed to apply, with its kind-qualified name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Kind-qualified identifier, e.g. `table user` or `view v_orders`.
    pub object: String,
    pub error: String,
}

/// Outcome of one apply run: created names per kind plus ordered failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImportResult {
    pub tables_created: Vec<String>,
    pub views_created: Vec<String>,
    pub functions_created: Vec<String>,
    pub procedures_created: Vec<String>,
    pub triggers_created: Vec<String>,
    pub events_created: Vec<String>,
    pub failures: Vec<ImportFailure>,
}

impl ImportResult {
    /// Success is defined as "the failure list is empty", regardless of any
    /// earlier caught-and-recorded state.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of objects created (or planned, in dry-run).
    pub fn total_created(&self) -> usize {
        self.tables_created.len()
            + self.views_created.len()
            + self.functions_created.len()
            + self.procedures_created.len()
            + self.triggers_created.len()
            + self.events_created.len()
    }

    /// The created-name list for one object kind.
    pub fn created_mut(&mut self, kind: ObjectKind) -> &mut Vec<String> {
        match kind {
            ObjectKind::Table => &mut self.tables_created,
            ObjectKind::View => &mut self.views_created,
            ObjectKind::Function => &mut self.functions_created,
            ObjectKind::Procedure => &mut self.procedures_created,
            ObjectKind::Trigger => &mut self.triggers_created,
            ObjectKind::Event => &mut self.events_created,
        }
    }

    /// Records a failed object with its kind-qualified name.
    pub fn record_failure(&mut self, kind: ObjectKind, name: &str, error: impl std::fmt::Display) {
        self.failures.push(ImportFailure {
            object: format!("{kind} {name}"),
            error: error.to_string(),
        });
    }
}

/// Result of a validation pass over a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn schema_starts_empty() {
        let schema = Schema::new("shop");
        assert_eq!(schema.format_version, FORMAT_VERSION);
        assert_eq!(schema.database, "shop");
        assert_eq!(schema.object_count(), 0);
    }

    #[test]
    fn referential_action_defaults_to_restrict() {
        assert_eq!(
            ReferentialAction::from_catalog(None),
            ReferentialAction::Restrict
        );
        assert_eq!(
            ReferentialAction::from_catalog(Some("cascade")),
            ReferentialAction::Cascade
        );
        assert_eq!(
            ReferentialAction::from_catalog(Some("SOMETHING ELSE")),
            ReferentialAction::Restrict
        );
    }

    #[test]
    fn column_key_parses_catalog_values() {
        assert_eq!(ColumnKey::from_catalog("PRI"), ColumnKey::Primary);
        assert_eq!(ColumnKey::from_catalog("UNI"), ColumnKey::Unique);
        assert_eq!(ColumnKey::from_catalog("MUL"), ColumnKey::Indexed);
        assert_eq!(ColumnKey::from_catalog(""), ColumnKey::None);
    }

    #[test]
    fn retain_tables_clears_other_kinds() {
        let mut schema = Schema::new("shop");
        schema.tables.push(Table {
            name: "user".to_string(),
            columns: vec![column("id", "int")],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            collation: None,
            comment: None,
            create_statement: None,
        });
        schema.tables.push(Table {
            name: "order".to_string(),
            columns: vec![column("id", "int")],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: None,
            collation: None,
            comment: None,
            create_statement: None,
        });
        schema.views.push(View {
            name: "v".to_string(),
            definition: "select 1".to_string(),
            check_option: None,
            is_updatable: false,
            definer: None,
            security_type: None,
            charset: None,
            collation: None,
        });

        let filtered = schema.retain_tables(&["user".to_string()]);
        assert_eq!(filtered.tables.len(), 1);
        assert_eq!(filtered.tables[0].name, "user");
        assert!(filtered.views.is_empty());
    }

    #[test]
    fn apply_order_puts_tables_before_everything() {
        assert_eq!(ObjectKind::APPLY_ORDER[0], ObjectKind::Table);
        assert_eq!(ObjectKind::APPLY_ORDER[1], ObjectKind::View);
        assert_eq!(ObjectKind::APPLY_ORDER.len(), 6);
    }

    #[test]
    fn import_result_success_tracks_failures() {
        let mut result = ImportResult::default();
        assert!(result.success());
        result.record_failure(ObjectKind::Table, "user", "boom");
        assert!(!result.success());
        assert_eq!(result.failures[0].object, "table user");
    }
}
