use super::{ConversionContext, GroupBuilder};
use crate::core::{double_quote, GroupKey, MetadataRow};
use crate::error::Result;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Views. Definitions split over several catalog rows are concatenated
/// before rewriting.
pub struct ViewBuilder<'a> {
    ctx: &'a ConversionContext,
    open: Option<OpenView>,
}

struct OpenView {
    source_schema: String,
    target_schema: String,
    name: String,
    body: String,
}

impl<'a> ViewBuilder<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self { ctx, open: None }
    }

    fn rewrite(&self, view: &OpenView) -> String {
        let mut body = self.ctx.profile.rewrite_view(&view.body);
        if view.source_schema != view.target_schema {
            let target = self.ctx.quote(&view.target_schema);
            for form in [
                double_quote(&view.source_schema),
                format!("[{}]", view.source_schema),
                self.ctx.quote(&view.source_schema),
            ] {
                if form != view.source_schema {
                    body = body.replace(&form, &target);
                }
            }
        }
        body.trim().to_string()
    }
}

impl GroupBuilder for ViewBuilder<'_> {
    type Output = String;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        let view = row.object();
        if !self.ctx.filter.table_included(&view) {
            debug!("View {} excluded by filter", view);
            return Ok(None);
        }
        if row.text(2).is_none() {
            warn!("View {}.{} has no definition, skipped", row.schema(), view);
            return Ok(None);
        }
        Ok(Some(GroupKey::object(row.schema(), view)))
    }

    fn open(&mut self, key: &GroupKey, row: &MetadataRow, _: &mut VecDeque<String>) -> Result<()> {
        let target_schema = self.ctx.schemas.target_schema(&key.schema);
        self.open = Some(OpenView {
            name: self.ctx.options.quote.qualify(&target_schema, &key.object),
            source_schema: key.schema.clone(),
            target_schema,
            body: raw_definition(row),
        });
        Ok(())
    }

    fn extend(&mut self, row: &MetadataRow) -> Result<()> {
        if let Some(open) = self.open.as_mut() {
            open.body.push_str(&raw_definition(row));
        }
        Ok(())
    }

    fn close(&mut self) -> Option<String> {
        let view = self.open.take()?;
        let body = self.rewrite(&view);
        let sep = &self.ctx.options.separator;
        Some(format!(
            "DROP VIEW IF EXISTS {}{}\n{}\n{}\n",
            view.name, sep, body, sep
        ))
    }
}

/// Definition chunk without trimming; chunk boundaries may fall mid-token.
fn raw_definition(row: &MetadataRow) -> String {
    row.raw_text(2).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crate::ddl::testing::{collect, context, row};
    use crate::ddl::views;
    use crate::dialect::Dialect;
    use crate::filter::{SchemaMapper, TableFilter};

    #[test]
    fn test_view_is_rewritten_and_wrapped() {
        let ctx = context(Dialect::Mssql, Dialect::Postgres);
        let rows = vec![row(&[
            "dbo",
            "v_orders",
            "CREATE VIEW [dbo].[v_orders] WITH SCHEMABINDING AS SELECT [id] FROM [dbo].[orders]",
        ])];
        let stmts = collect(views(rows, &ctx));
        assert_eq!(
            stmts,
            vec![
                "DROP VIEW IF EXISTS dbo.v_orders;\n\
                 CREATE VIEW \"dbo\".\"v_orders\"  AS SELECT \"id\" FROM \"dbo\".\"orders\"\n;\n"
            ]
        );
    }

    #[test]
    fn test_multi_row_definition_is_concatenated() {
        let ctx = context(Dialect::Mssql, Dialect::Postgres);
        let rows = vec![
            row(&["dbo", "v", "CREATE VIEW v AS SEL"]),
            row(&["dbo", "v", "ECT 1 AS one"]),
            row(&["dbo", "w", "CREATE VIEW w AS SELECT 2"]),
        ];
        let stmts = collect(views(rows, &ctx));
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("CREATE VIEW v AS SELECT 1 AS one\n"));
    }

    #[test]
    fn test_schema_is_renamed_in_body() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.schemas = SchemaMapper::new(Some("demo".to_string()), Default::default());
        let rows = vec![row(&["dbo", "v", "CREATE VIEW [dbo].[v] AS SELECT a FROM [dbo].[t]"])];
        let stmts = collect(views(rows, &ctx));
        assert_eq!(
            stmts[0],
            "DROP VIEW IF EXISTS demo.v;\nCREATE VIEW demo.\"v\" AS SELECT a FROM demo.\"t\"\n;\n"
        );
    }

    #[test]
    fn test_null_definition_and_filter() {
        let mut ctx = context(Dialect::Mssql, Dialect::Postgres);
        ctx.filter = TableFilter::new(Vec::<&str>::new(), vec!["hidden"]).unwrap();
        let rows = vec![
            row(&["dbo", "empty", "NULL"]),
            row(&["dbo", "hidden", "CREATE VIEW hidden AS SELECT 1"]),
        ];
        assert!(collect(views(rows, &ctx)).is_empty());
    }
}
