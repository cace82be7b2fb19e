use super::{terminate, ColumnSpec, ConversionContext, GroupBuilder};
use crate::core::{GroupKey, MetadataRow};
use crate::error::Result;
use crate::template::{ColumnSlot, SchemaSlot, TableSlot, TailSlot};
use std::collections::{HashSet, VecDeque};

/// Builds one CREATE TABLE per (schema, table) group.
pub struct TableBuilder<'a> {
    ctx: &'a ConversionContext,
    current: Option<ColumnSpec>,
    created_schemas: HashSet<String>,
    open: Option<OpenTable>,
}

struct OpenTable {
    header: String,
    first_column: String,
    columns: Vec<String>,
}

impl<'a> TableBuilder<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self {
            ctx,
            current: None,
            created_schemas: HashSet::new(),
            open: None,
        }
    }

    fn column_line(&self, spec: &ColumnSpec) -> String {
        let profile = &self.ctx.profile;
        self.ctx
            .templates
            .table_column
            .render(|slot| match slot {
                ColumnSlot::Clname => self.ctx.quote(&spec.column),
                ColumnSlot::Tyname => spec.declaration(),
                ColumnSlot::Isnull => spec.nullability.clone(),
                ColumnSlot::Dfval => profile.render_default(spec.default.as_deref()),
            })
            .trim_end()
            .to_string()
    }
}

impl GroupBuilder for TableBuilder<'_> {
    type Output = String;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        self.current = self.ctx.column_policy().classify(row)?;
        Ok(self
            .current
            .as_ref()
            .map(|spec| GroupKey::object(&spec.schema, &spec.table)))
    }

    fn open(
        &mut self,
        _key: &GroupKey,
        _row: &MetadataRow,
        out: &mut VecDeque<String>,
    ) -> Result<()> {
        let Some(spec) = self.current.take() else {
            return Ok(());
        };
        let templates = &self.ctx.templates;
        let separator = &self.ctx.options.separator;
        let scname = self.ctx.quote(&self.ctx.schemas.target_schema(&spec.schema));
        let tbname = self.ctx.quote(&spec.table);

        if self.created_schemas.insert(scname.clone()) && !templates.schema.is_blank() {
            let stmt = templates.schema.render(|slot| match slot {
                SchemaSlot::Scname => scname.clone(),
            });
            out.push_back(terminate(&stmt, separator));
        }

        let table_slots = |slot: TableSlot| match slot {
            TableSlot::Scname => scname.clone(),
            TableSlot::Tbname => tbname.clone(),
        };
        if self.ctx.options.add_drop && !templates.drop_table.is_blank() {
            out.push_back(terminate(&templates.drop_table.render(table_slots), separator));
        }

        let first = self.column_line(&spec);
        self.open = Some(OpenTable {
            header: templates.table_header.render(table_slots),
            first_column: self.ctx.quote(&spec.column),
            columns: vec![first],
        });
        Ok(())
    }

    fn extend(&mut self, _row: &MetadataRow) -> Result<()> {
        if let Some(spec) = self.current.take() {
            let line = self.column_line(&spec);
            if let Some(table) = self.open.as_mut() {
                table.columns.push(line);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Option<String> {
        let table = self.open.take()?;
        let tail = self.ctx.templates.table_tail.render(|slot| match slot {
            TailSlot::Clname => table.first_column.clone(),
        });
        let stmt = format!("{}\n{}\n{}", table.header, table.columns.join(",\n"), tail);
        Some(terminate(&stmt, &self.ctx.options.separator))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::Quoter;
    use crate::ddl::testing::{collect, context, row};
    use crate::ddl::tables;
    use crate::dialect::Dialect;
    use crate::error::MigrateError;
    use crate::filter::SchemaMapper;

    fn sample() -> Vec<crate::core::MetadataRow> {
        vec![
            row(&["dbo", "A", "id", "INT", "4", "0", "NOT NULL", "IDENTITY(1,1)"]),
            row(&["dbo", "A", "name", "VARCHAR", "10", "0", "", "('n/a')"]),
            row(&["dbo", "B", "id", "INT", "4", "0", "NOT NULL", "NULL"]),
        ]
    }

    #[test]
    fn test_one_statement_per_table_after_schema() {
        let ctx = context(Dialect::Mssql, Dialect::Postgres);
        let stmts = collect(tables(sample(), &ctx));
        assert_eq!(
            stmts,
            vec![
                "CREATE SCHEMA IF NOT EXISTS dbo;\n",
                "CREATE TABLE dbo.A (\n    id INTEGER NOT NULL GENERATED BY DEFAULT AS IDENTITY,\n    name VARCHAR(10)  DEFAULT 'n/a'\n);\n",
                "CREATE TABLE dbo.B (\n    id INTEGER NOT NULL\n);\n",
            ]
        );
    }

    #[test]
    fn test_add_drop_and_quoting() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.options.add_drop = true;
        ctx.options.quote = Quoter::new(Some("\"".to_string()));
        ctx.schemas = SchemaMapper::new(Some("stage".to_string()), Default::default());
        let stmts = collect(tables(sample().into_iter().take(1), &ctx));
        assert_eq!(stmts[0], "CREATE SCHEMA IF NOT EXISTS \"stage\";\n");
        assert_eq!(stmts[1], "DROP TABLE IF EXISTS \"stage\".\"A\";\n");
        assert!(stmts[2].starts_with("CREATE TABLE \"stage\".\"A\" (\n    \"id\" INTEGER"));
    }

    #[test]
    fn test_vector_tail_names_first_column() {
        let ctx = context(Dialect::Mssql, Dialect::Vector);
        let stmts = collect(tables(sample().into_iter().take(2), &ctx));
        assert_eq!(stmts[0], "CREATE SCHEMA AUTHORIZATION dbo;\n");
        assert!(stmts[1].ends_with(") WITH PARTITION = (HASH ON id DEFAULT PARTITIONS);\n"));
    }

    #[test]
    fn test_unmapped_type_aborts_generation() {
        let ctx = context(Dialect::Postgres, Dialect::Vector);
        let rows = vec![
            row(&["public", "T", "id", "INTEGER", "32", "0", "NOT NULL", "NULL"]),
            row(&["public", "T", "at", "DATETIME", "0", "0", "", "NULL"]),
        ];
        let results: Vec<_> = tables(rows, &ctx).collect();
        let err = results
            .into_iter()
            .find_map(|r| r.err())
            .expect("generation should fail");
        assert!(matches!(err, MigrateError::UnsupportedType { ref type_name, .. } if type_name == "DATETIME"));
    }

    #[test]
    fn test_unmapped_type_is_omitted_when_skipping() {
        let mut ctx = context(Dialect::Postgres, Dialect::Vector);
        ctx.options.skip_unsupported = true;
        let rows = vec![
            row(&["public", "T", "id", "INTEGER", "32", "0", "NOT NULL", "NULL"]),
            row(&["public", "T", "at", "DATETIME", "0", "0", "", "NULL"]),
        ];
        let stmts = collect(tables(rows, &ctx));
        assert_eq!(stmts.len(), 2);
        assert!(!stmts[1].contains("at "));
        assert!(stmts[1].contains("id INTEGER NOT NULL"));
    }

    #[test]
    fn test_table_with_no_kept_columns_is_not_emitted() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.options.skip_unsupported = true;
        let rows = vec![row(&["dbo", "X", "v", "SQL_VARIANT", "0", "0", "", "NULL"])];
        assert!(collect(tables(rows, &ctx)).is_empty());
    }

    #[test]
    fn test_schema_statement_once_per_schema() {
        let ctx = context(Dialect::Mssql, Dialect::Mysql);
        let rows = vec![
            row(&["dbo", "A", "id", "INT", "4", "0", "", "NULL"]),
            row(&["dbo", "B", "id", "INT", "4", "0", "", "NULL"]),
            row(&["sales", "C", "id", "INT", "4", "0", "", "NULL"]),
        ];
        let stmts = collect(tables(rows, &ctx));
        let schemas: Vec<_> = stmts
            .iter()
            .filter(|s| s.starts_with("CREATE DATABASE"))
            .collect();
        assert_eq!(schemas.len(), 2);
        assert_eq!(stmts.len(), 5);
    }
}
