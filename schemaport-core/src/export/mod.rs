//! Snapshot exporters.
//!
//! Four renderings of one [`Schema`]: a creation script, the lossless
//! JSON interchange form, TypeScript type declarations, and Markdown
//! reference documentation. Only the interchange form round-trips; the
//! other three are one-way.

pub mod docs;
pub mod sql;
pub mod types;

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaPortError};
use crate::extract::{ExtractOptions, SchemaExtractor};
use crate::models::Schema;

/// Output format for a snapshot export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Executable SQL creation script.
    Sql,
    /// Lossless JSON interchange document.
    Json,
    /// TypeScript type declarations for row shapes.
    Types,
    /// Markdown reference documentation.
    Markdown,
}

impl ExportFormat {
    /// Conventional file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Types => "d.ts",
            Self::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Types => "types",
            Self::Markdown => "markdown",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ExportFormat {
    type Err = SchemaPortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "json" => Ok(Self::Json),
            "types" | "ts" | "typescript" => Ok(Self::Types),
            "markdown" | "md" | "docs" => Ok(Self::Markdown),
            other => Err(SchemaPortError::unsupported(format!(
                "export format '{other}' (expected sql, json, types or markdown)"
            ))),
        }
    }
}

/// Renders a snapshot in the requested format.
pub fn export(schema: &Schema, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Sql => sql::render(schema),
        ExportFormat::Json => to_interchange(schema),
        ExportFormat::Types => Ok(types::render(schema)),
        ExportFormat::Markdown => Ok(docs::render(schema)),
    }
}

/// Exports the active database in the requested format, extracting a
/// fresh full snapshot when none is supplied.
pub async fn export_schema(
    extractor: &SchemaExtractor<'_>,
    schema: Option<&Schema>,
    format: ExportFormat,
) -> Result<String> {
    match schema {
        Some(schema) => export(schema, format),
        None => {
            let fresh = extractor.extract_schema(&ExtractOptions::default()).await?;
            export(&fresh, format)
        }
    }
}

/// Serializes a snapshot to the pretty-printed JSON interchange form.
pub fn to_interchange(schema: &Schema) -> Result<String> {
    serde_json::to_string_pretty(schema)
        .map_err(|e| SchemaPortError::interchange("failed to serialize snapshot", e))
}

/// Parses a snapshot from its JSON interchange form.
pub fn from_interchange(json: &str) -> Result<Schema> {
    serde_json::from_str(json)
        .map_err(|e| SchemaPortError::interchange("failed to parse snapshot document", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_accepts_aliases() {
        assert_eq!("SQL".parse::<ExportFormat>().unwrap(), ExportFormat::Sql);
        assert_eq!("ts".parse::<ExportFormat>().unwrap(), ExportFormat::Types);
        assert_eq!(
            "md".parse::<ExportFormat>().unwrap(),
            ExportFormat::Markdown
        );
        assert!("yaml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn interchange_rejects_malformed_documents() {
        let error = from_interchange("{\"tables\": [").unwrap_err();
        assert!(error.to_string().contains("snapshot document"));
    }
}
