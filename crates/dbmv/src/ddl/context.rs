use crate::core::{MetadataRow, Quoter};
use crate::dialect::{PairProfile, TypeRule};
use crate::error::{MigrateError, Result};
use crate::filter::{SchemaMapper, TableFilter};
use crate::template::DdlTemplates;
use tracing::{debug, warn};

/// Naming and sizing knobs for generated DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlOptions {
    pub quote: Quoter,
    pub separator: String,
    pub charmax: i64,
    pub add_drop: bool,
    pub skip_unsupported: bool,
    pub index_separator: String,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            quote: Quoter::default(),
            separator: ";".to_string(),
            charmax: 6400,
            add_drop: false,
            skip_unsupported: false,
            index_separator: "_ax11_".to_string(),
        }
    }
}

/// Everything the DDL builders and the copy planner share for one run.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    pub profile: PairProfile,
    pub templates: DdlTemplates,
    pub filter: TableFilter,
    pub schemas: SchemaMapper,
    pub options: DdlOptions,
}

impl ConversionContext {
    pub fn quote(&self, name: &str) -> String {
        self.options.quote.quote(name)
    }

    pub fn column_policy(&self) -> ColumnPolicy<'_> {
        ColumnPolicy { ctx: self }
    }
}

/// A table column that survived the policy, with its translation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub type_name: String,
    pub rule: TypeRule,
    pub precision: i64,
    pub scale: i64,
    pub nullability: String,
    pub default: Option<String>,
}

impl ColumnSpec {
    /// Target type declaration with size filled in.
    pub fn declaration(&self) -> String {
        self.rule.declaration(self.precision, self.scale)
    }
}

/// Decides which table-catalog rows become columns.
///
/// CREATE TABLE generation and copy planning both go through this, so a
/// created table and its INSERT statements always agree on column count.
#[derive(Debug, Clone, Copy)]
pub struct ColumnPolicy<'a> {
    ctx: &'a ConversionContext,
}

impl<'a> ColumnPolicy<'a> {
    /// `Ok(None)` means the column is skipped; an unmapped type is fatal
    /// unless skip-unsupported is set.
    pub fn classify(&self, row: &MetadataRow) -> Result<Option<ColumnSpec>> {
        let schema = row.schema();
        let table = row.object();
        let column = row.text_or_empty(2);
        let type_name = row.text_or_empty(3).to_uppercase();
        let options = &self.ctx.options;
        let profile = &self.ctx.profile;

        if !self.ctx.filter.included(&table, &column) {
            debug!("Column {}.{} excluded by filter", table, column);
            return Ok(None);
        }

        if profile.is_unsupported(&type_name) {
            warn!(
                "Column {}.{}.{} of type {} is not supported by {}, skipped",
                schema,
                table,
                column,
                type_name,
                profile.target()
            );
            return Ok(None);
        }

        let rule = match profile.types().lookup(&type_name) {
            Ok(rule) => *rule,
            Err(_) if options.skip_unsupported => {
                warn!(
                    "Column {}.{}.{} has unmapped type {}, skipped",
                    schema, table, column, type_name
                );
                return Ok(None);
            }
            Err(_) => {
                return Err(MigrateError::unsupported_type(
                    type_name,
                    format!(
                        "column {}.{}.{} ({} -> {})",
                        schema,
                        table,
                        column,
                        profile.source(),
                        profile.target()
                    ),
                ));
            }
        };

        let mut precision = row.integer(4).unwrap_or(0);
        if precision > options.charmax {
            warn!(
                "Column {}.{}.{} precision {} exceeds charmax {}, skipped",
                schema, table, column, precision, options.charmax
            );
            return Ok(None);
        }
        if precision <= 0 {
            precision = options.charmax;
        }

        Ok(Some(ColumnSpec {
            schema,
            table,
            column,
            type_name,
            rule,
            precision,
            scale: row.integer(5).unwrap_or(0),
            nullability: row.text_or_empty(6),
            default: row.text(7),
        }))
    }
}
