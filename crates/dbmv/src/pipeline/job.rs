use crate::core::{double_quote, GroupKey, MetadataRow, Row};
use crate::ddl::{ColumnSpec, ConversionContext, GroupBuilder, Grouped};
use crate::error::Result;
use crate::marshal::{NullMode, RowTemplate};
use crate::template::TableSlot;
use std::collections::VecDeque;

/// Multi-row INSERT for one table: a fixed prefix plus one rendered tuple
/// per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTemplate {
    pub prefix: String,
    pub row: RowTemplate,
}

impl InsertTemplate {
    pub fn render_batch(&self, rows: &[Row]) -> String {
        let mut sql = self.prefix.clone();
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(&self.row.render(row, NullMode::Load));
        }
        sql
    }
}

/// Everything needed to copy one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source_schema: String,
    pub table_name: String,
    pub target_schema: String,
    pub column_count: usize,
    pub select_sql: String,
    pub insert: InsertTemplate,
    /// Per-column insert casts, reused to build unload lines.
    pub casts: Vec<String>,
    /// Empty when the target has no truncate template.
    pub truncate_sql: String,
}

impl CopyJob {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.target_schema, self.table_name)
    }
}

/// Groups table-catalog rows into copy jobs using the same column policy as
/// CREATE TABLE generation.
pub struct CopyPlanner<'a> {
    ctx: &'a ConversionContext,
    current: Option<ColumnSpec>,
    open: Option<PlannedTable>,
}

struct PlannedTable {
    source_schema: String,
    table: String,
    selects: Vec<String>,
    casts: Vec<String>,
}

impl<'a> CopyPlanner<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self {
            ctx,
            current: None,
            open: None,
        }
    }

    fn add_column(table: &mut PlannedTable, spec: &ColumnSpec) {
        table.selects.push(spec.rule.select_expr(
            &double_quote(&spec.column),
            spec.precision,
            spec.scale,
        ));
        table.casts.push(spec.rule.insert_expr(spec.precision, spec.scale));
    }
}

impl GroupBuilder for CopyPlanner<'_> {
    type Output = CopyJob;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        self.current = self.ctx.column_policy().classify(row)?;
        Ok(self
            .current
            .as_ref()
            .map(|spec| GroupKey::object(&spec.schema, &spec.table)))
    }

    fn open(&mut self, key: &GroupKey, _: &MetadataRow, _: &mut VecDeque<CopyJob>) -> Result<()> {
        let mut table = PlannedTable {
            source_schema: key.schema.clone(),
            table: key.object.clone(),
            selects: Vec::new(),
            casts: Vec::new(),
        };
        if let Some(spec) = self.current.take() {
            Self::add_column(&mut table, &spec);
        }
        self.open = Some(table);
        Ok(())
    }

    fn extend(&mut self, _: &MetadataRow) -> Result<()> {
        if let (Some(table), Some(spec)) = (self.open.as_mut(), self.current.take()) {
            Self::add_column(table, &spec);
        }
        Ok(())
    }

    fn close(&mut self) -> Option<CopyJob> {
        let table = self.open.take()?;
        let ctx = self.ctx;
        let target_schema = ctx.schemas.target_schema(&table.source_schema);
        let scname = ctx.quote(&target_schema);
        let tbname = ctx.quote(&table.table);

        let select_sql = format!(
            "SELECT {} FROM {}.{}",
            table.selects.join(", "),
            double_quote(&table.source_schema),
            double_quote(&table.table)
        );
        let truncate_sql = ctx.templates.truncate.render(|slot| match slot {
            TableSlot::Scname => scname.clone(),
            TableSlot::Tbname => tbname.clone(),
        });

        Some(CopyJob {
            insert: InsertTemplate {
                prefix: format!("INSERT INTO {}.{} VALUES ", scname, tbname),
                row: RowTemplate::for_insert(&table.casts),
            },
            column_count: table.casts.len(),
            source_schema: table.source_schema,
            table_name: table.table,
            target_schema,
            select_sql,
            casts: table.casts,
            truncate_sql,
        })
    }
}

/// Plan one copy job per table, in catalog order.
pub fn plan_copy_jobs<R>(rows: R, ctx: &ConversionContext) -> Result<Vec<CopyJob>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, CopyPlanner::new(ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Quoter, SqlValue};
    use crate::ddl::testing::{context, row};
    use crate::ddl::{tables, testing::collect};
    use crate::dialect::Dialect;
    use crate::error::MigrateError;
    use crate::filter::{SchemaMapper, TableFilter};

    fn catalog() -> Vec<MetadataRow> {
        vec![
            row(&["dbo", "A", "id", "INT", "4", "0", "NOT NULL", "NULL"]),
            row(&["dbo", "A", "name", "VARCHAR", "10", "0", "", "NULL"]),
            row(&["dbo", "A", "at", "DATETIME", "8", "3", "", "NULL"]),
            row(&["dbo", "B", "id", "INT", "4", "0", "NOT NULL", "NULL"]),
        ]
    }

    #[test]
    fn test_one_job_per_table() {
        let ctx = context(Dialect::Mssql, Dialect::Postgres);
        let jobs = plan_copy_jobs(catalog(), &ctx).unwrap();
        assert_eq!(jobs.len(), 2);

        let a = &jobs[0];
        assert_eq!(a.table_name, "A");
        assert_eq!(a.column_count, 3);
        assert_eq!(
            a.select_sql,
            "SELECT \"id\", \"name\", CONVERT(VARCHAR,\"at\",121) FROM \"dbo\".\"A\""
        );
        assert_eq!(a.insert.prefix, "INSERT INTO dbo.A VALUES ");
        assert_eq!(a.truncate_sql, "TRUNCATE TABLE dbo.A");
        assert_eq!(jobs[1].column_count, 1);
    }

    #[test]
    fn test_render_batch() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.options.quote = Quoter::new(Some("\"".to_string()));
        ctx.schemas = SchemaMapper::new(Some("stage".to_string()), Default::default());
        let jobs = plan_copy_jobs(catalog(), &ctx).unwrap();
        let sql = jobs[0].insert.render_batch(&[
            vec![SqlValue::I32(1), "x".into(), "2024-01-01 00:00:00.000".into()],
            vec![SqlValue::I32(2), SqlValue::Null, SqlValue::Null],
        ]);
        assert_eq!(
            sql,
            "INSERT INTO \"stage\".\"A\" VALUES (1,'x','2024-01-01 00:00:00.000'),(2,NULL,NULL)"
        );
    }

    #[test]
    fn test_column_count_matches_create_table() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.filter = TableFilter::new(Vec::<&str>::new(), vec!["A.name"]).unwrap();
        let jobs = plan_copy_jobs(catalog(), &ctx).unwrap();
        let ddl = collect(tables(catalog(), &ctx));
        let create_a = ddl.iter().find(|s| s.starts_with("CREATE TABLE dbo.A")).unwrap();
        assert_eq!(jobs[0].column_count, create_a.matches(",\n").count() + 1);
        assert_eq!(jobs[0].column_count, 2);
    }

    #[test]
    fn test_unmapped_type_fails_planning() {
        let ctx = context(Dialect::Mssql, Dialect::Postgres);
        let rows = vec![row(&["dbo", "X", "v", "SQL_VARIANT", "0", "0", "", "NULL"])];
        assert!(matches!(
            plan_copy_jobs(rows, &ctx),
            Err(MigrateError::UnsupportedType { .. })
        ));
    }
}
