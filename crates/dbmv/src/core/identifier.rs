//! Identifier validation and quoting.
//!
//! Generated DDL and DML embed schema, table and column names as text, so
//! every name passes through [`Quoter`] before it lands in a statement.
//! Quoting is opt-in: a run with no quote character configured emits bare
//! names, which is what most targets expect for unquoted upper/lower case
//! folding.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - Vector/Ingres: 256 bytes
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier supplied through configuration.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wraps names in the configured quote character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quoter {
    quote: Option<String>,
}

impl Quoter {
    pub fn new(quote: Option<String>) -> Self {
        Self {
            quote: quote.filter(|q| !q.is_empty()),
        }
    }

    /// Quote a name; embedded quote characters are doubled.
    pub fn quote(&self, name: &str) -> String {
        match &self.quote {
            Some(q) => format!("{q}{}{q}", name.replace(q.as_str(), &q.repeat(2))),
            None => name.to_string(),
        }
    }

    /// `schema.table`, each part quoted.
    pub fn qualify(&self, schema: &str, name: &str) -> String {
        format!("{}.{}", self.quote(schema), self.quote(name))
    }
}

/// Always double-quote a name, regardless of configuration.
///
/// Used for column references inside catalog-derived SELECT lists, where the
/// source must see the exact case stored in its catalog.
pub fn double_quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
