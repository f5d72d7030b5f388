//! Core library for schemaport: relational schema extraction, export,
//! comparison and replay.
//!
//! The crate is organized around a [`models::Schema`] snapshot:
//!
//! - [`gateway`] owns the database connection and its session settings
//! - [`extract`] walks catalog metadata into a snapshot
//! - [`export`] renders a snapshot as SQL, JSON interchange, TypeScript
//!   declarations or Markdown docs
//! - [`compare`] diffs two snapshots structurally
//! - [`import`] replays a snapshot against a live database

pub mod compare;
pub mod error;
pub mod export;
pub mod extract;
pub mod gateway;
pub mod ident;
pub mod import;
pub mod logging;
pub mod models;

pub use compare::compare_schemas;
pub use error::{Result, SchemaPortError, redact_database_url};
pub use export::{ExportFormat, export, export_schema, from_interchange, to_interchange};
pub use extract::{ExtractOptions, SchemaExtractor};
pub use gateway::{ConnectionConfig, MetadataGateway, parse_connection_config};
pub use import::{ImportOptions, SchemaImporter};
pub use logging::init_logging;
pub use models::{
    ImportResult, ObjectKind, Schema, SchemaComparison, TableDiff, ValidationReport,
};
