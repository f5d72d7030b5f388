//! Centralized identifier quoting.
//!
//! Object names read back from the catalog are interpolated into DDL text,
//! so they pass through a single allowlist check here rather than being
//! escaped ad hoc at each call site. A maliciously named catalog object
//! fails the allowlist and aborts instead of reaching the server.

use crate::error::{Result, SchemaPortError};

/// Maximum identifier length accepted by the dialect.
const MAX_IDENT_LEN: usize = 64;

/// Returns true when `name` consists only of allowlisted identifier
/// characters: ASCII letters, digits, `_`, `$`, space and `-`.
pub fn is_valid(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENT_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | ' ' | '-'))
}

/// Backtick-quotes an identifier after validating it against the allowlist.
pub fn quote(name: &str) -> Result<String> {
    if !is_valid(name) {
        return Err(SchemaPortError::configuration(format!(
            "invalid identifier {name:?}: only letters, digits, '_', '$', ' ' and '-' are allowed (max {MAX_IDENT_LEN} chars)"
        )));
    }
    Ok(format!("`{name}`"))
}

/// Quotes a `database.object` pair.
pub fn quote_qualified(database: &str, name: &str) -> Result<String> {
    Ok(format!("{}.{}", quote(database)?, quote(name)?))
}
