//! Table/column inclusion rules and source → target schema naming.

mod schema;

pub use schema::{parse_translation, SchemaMapper, SCHEMA_HEADER, INDEX_SCHEMA_HEADER};

use crate::error::{MigrateError, Result};
use std::collections::BTreeSet;
use tracing::warn;

/// Decides which (table, column) pairs take part in a run.
///
/// Entries are either `TABLE` or `TABLE.COLUMN`; matching is
/// case-insensitive. The decision is a pure function of the configured
/// lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: BTreeSet<String>,
    include_columns: BTreeSet<String>,
    exclude_tables: BTreeSet<String>,
    exclude_columns: BTreeSet<String>,
}

impl TableFilter {
    /// Build a filter from raw include/exclude entries and reject ambiguous
    /// combinations.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let (include_tables, include_columns) = split_entries(include, "include");
        let (exclude_tables, exclude_columns) = split_entries(exclude, "exclude");
        let filter = Self {
            include_tables,
            include_columns,
            exclude_tables,
            exclude_columns,
        };
        filter.check_conflicts()?;
        Ok(filter)
    }

    /// A filter that keeps everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    fn has_includes(&self) -> bool {
        !self.include_tables.is_empty() || !self.include_columns.is_empty()
    }

    fn has_excludes(&self) -> bool {
        !self.exclude_tables.is_empty() || !self.exclude_columns.is_empty()
    }

    /// Whether `table.column` participates in the run.
    pub fn included(&self, table: &str, column: &str) -> bool {
        let table = table.to_uppercase();
        let qualified = format!("{}.{}", table, column.to_uppercase());

        if self.has_includes() {
            if self.include_tables.contains(&table) {
                return !self.exclude_columns.contains(&qualified);
            }
            return self.include_columns.contains(&qualified);
        }

        if self.has_excludes() {
            if self.exclude_tables.contains(&table) {
                return false;
            }
            return !self.exclude_columns.contains(&qualified);
        }

        true
    }

    /// Whether any column of `table` can be included; used for objects that
    /// carry no column of their own, such as views.
    pub fn table_included(&self, table: &str) -> bool {
        let table = table.to_uppercase();
        if self.has_includes() {
            let prefix = format!("{}.", table);
            return self.include_tables.contains(&table)
                || self.include_columns.iter().any(|c| c.starts_with(&prefix));
        }
        !self.exclude_tables.contains(&table)
    }

    fn check_conflicts(&self) -> Result<()> {
        let tables: Vec<_> = self
            .include_tables
            .intersection(&self.exclude_tables)
            .cloned()
            .collect();
        if !tables.is_empty() {
            return Err(MigrateError::Config(format!(
                "tables both included and excluded: {}",
                tables.join(", ")
            )));
        }

        let columns: Vec<_> = self
            .include_columns
            .intersection(&self.exclude_columns)
            .cloned()
            .collect();
        if !columns.is_empty() {
            return Err(MigrateError::Config(format!(
                "columns both included and excluded: {}",
                columns.join(", ")
            )));
        }

        let shadowed: Vec<_> = self
            .include_columns
            .iter()
            .filter(|col| {
                self.exclude_tables
                    .iter()
                    .any(|t| col.starts_with(&format!("{}.", t)))
            })
            .cloned()
            .collect();
        if !shadowed.is_empty() {
            return Err(MigrateError::Config(format!(
                "included columns belong to excluded tables: {}",
                shadowed.join(", ")
            )));
        }

        Ok(())
    }
}

/// Split raw entries into uppercased `TABLE` and `TABLE.COLUMN` sets;
/// anything else is logged and ignored.
fn split_entries<I>(entries: I, kind: &str) -> (BTreeSet<String>, BTreeSet<String>)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut tables = BTreeSet::new();
    let mut columns = BTreeSet::new();

    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        let parts: Vec<&str> = entry.split('.').collect();
        match parts.as_slice() {
            [table] if is_word(table) => {
                tables.insert(table.to_uppercase());
            }
            [table, column] if is_word(table) && is_word(column) => {
                columns.insert(entry.to_uppercase());
            }
            _ => warn!("Ignoring malformed {} entry '{}'", kind, entry),
        }
    }

    (tables, columns)
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}
