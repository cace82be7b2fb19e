use super::{placeholders, Template, TemplateSource, SELECT};
use crate::core::escape_literal;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

placeholders! {
    /// Slots shared by every catalog query.
    pub enum CatalogSlot {
        SchemaFilter => "schema_filter",
        TypesToSkip => "types_to_skip",
    }
}

/// Compiled source-side catalog queries.
#[derive(Debug, Clone)]
pub struct CatalogQueries {
    pub dialect: Dialect,
    tables: Template<CatalogSlot>,
    uniques: Template<CatalogSlot>,
    foreign_keys: Template<CatalogSlot>,
    indexes: Template<CatalogSlot>,
    views: Template<CatalogSlot>,
}

impl CatalogQueries {
    pub fn load(source: &dyn TemplateSource, dialect: Dialect) -> Result<Self> {
        let query = |id: &str| -> Result<Template<CatalogSlot>> {
            let text = source.template(dialect, SELECT, id).ok_or_else(|| {
                MigrateError::Template(format!(
                    "no '{}' catalog query for source {}",
                    id, dialect
                ))
            })?;
            Template::parse(&text)
        };

        Ok(Self {
            dialect,
            tables: query("tables")?,
            uniques: query("uniques")?,
            foreign_keys: query("foreign_keys")?,
            indexes: query("indexes")?,
            views: query("views")?,
        })
    }

    /// Column definitions; `types_to_skip` is a pre-joined `a','b` list.
    pub fn tables(&self, schema_filter: &str, types_to_skip: &str) -> String {
        render(&self.tables, schema_filter, types_to_skip)
    }

    pub fn uniques(&self, schema_filter: &str) -> String {
        render(&self.uniques, schema_filter, "")
    }

    pub fn foreign_keys(&self, schema_filter: &str) -> String {
        render(&self.foreign_keys, schema_filter, "")
    }

    pub fn indexes(&self, schema_filter: &str) -> String {
        render(&self.indexes, schema_filter, "")
    }

    pub fn views(&self, schema_filter: &str) -> String {
        render(&self.views, schema_filter, "")
    }
}

fn render(template: &Template<CatalogSlot>, schema_filter: &str, types_to_skip: &str) -> String {
    template.render(|slot| match slot {
        CatalogSlot::SchemaFilter => escape_literal(schema_filter),
        // Already a quoted list fragment; each name is a plain type keyword.
        CatalogSlot::TypesToSkip => types_to_skip.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::BuiltinTemplates;

    #[test]
    fn test_mssql_tables_query_substitutes_filters() {
        let queries = CatalogQueries::load(&BuiltinTemplates, Dialect::Mssql).unwrap();
        let sql = queries.tables("dbo", "image','xml");
        assert!(sql.contains("s.name = 'dbo'"));
        assert!(sql.contains("NOT IN ('image','xml')"));
        assert!(!sql.contains("${"));
    }

    #[test]
    fn test_schema_filter_is_escaped() {
        let queries = CatalogQueries::load(&BuiltinTemplates, Dialect::Postgres).unwrap();
        let sql = queries.views("o'hara");
        assert!(sql.contains("'o''hara'"));
    }

    #[test]
    fn test_source_without_queries_fails() {
        assert!(CatalogQueries::load(&BuiltinTemplates, Dialect::Vector).is_err());
    }
}
