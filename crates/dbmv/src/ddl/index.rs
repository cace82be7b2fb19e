use super::{terminate, ConversionContext, GroupBuilder};
use crate::core::{GroupKey, MetadataRow};
use crate::error::Result;
use crate::filter::INDEX_SCHEMA_HEADER;
use crate::template::IndexSlot;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Secondary indexes (not backing a primary key or unique constraint).
pub struct IndexBuilder<'a> {
    ctx: &'a ConversionContext,
    open: Option<OpenIndex>,
}

struct OpenIndex {
    ixuniq: String,
    iscname: String,
    ixname: String,
    scname: String,
    tbname: String,
    columns: Vec<String>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self { ctx, open: None }
    }
}

impl GroupBuilder for IndexBuilder<'_> {
    type Output = String;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        let table = row.object();
        let column = row.text_or_empty(6);
        if !self.ctx.filter.included(&table, &column) {
            debug!("Index column {}.{} excluded by filter", table, column);
            return Ok(None);
        }
        Ok(Some(GroupKey::member(row.schema(), table, row.text_or_empty(3))))
    }

    fn open(&mut self, key: &GroupKey, row: &MetadataRow, _: &mut VecDeque<String>) -> Result<()> {
        let ctx = self.ctx;
        let name = row.text_or_empty(3);
        let method = row.text_or_empty(4).to_uppercase();
        if !method.is_empty() && method != "BTREE" {
            warn!(
                "Index {} on {}.{} uses method {}; created as a default index",
                name, key.schema, key.object, method
            );
        }

        let index_schema = row.text(2).unwrap_or_else(|| key.schema.clone());
        self.open = Some(OpenIndex {
            ixuniq: uniqueness_prefix(&row.text_or_empty(5)),
            iscname: ctx.quote(&ctx.schemas.target_schema_for(INDEX_SCHEMA_HEADER, &index_schema)),
            ixname: ctx.quote(&format!("{}{}{}", name, ctx.options.index_separator, key.object)),
            scname: ctx.quote(&ctx.schemas.target_schema(&key.schema)),
            tbname: ctx.quote(&key.object),
            columns: vec![ctx.quote(&row.text_or_empty(6))],
        });
        Ok(())
    }

    fn extend(&mut self, row: &MetadataRow) -> Result<()> {
        if let Some(open) = self.open.as_mut() {
            open.columns.push(self.ctx.quote(&row.text_or_empty(6)));
        }
        Ok(())
    }

    fn close(&mut self) -> Option<String> {
        let open = self.open.take()?;
        let stmt = self.ctx.templates.index.render(|slot| match slot {
            IndexSlot::Ixuniq => open.ixuniq.clone(),
            IndexSlot::Iscname => open.iscname.clone(),
            IndexSlot::Ixname => open.ixname.clone(),
            IndexSlot::Scname => open.scname.clone(),
            IndexSlot::Tbname => open.tbname.clone(),
            IndexSlot::Clname => open.columns.join(","),
        });
        Some(terminate(&stmt, &self.ctx.options.separator))
    }
}

/// `UNIQUE ` for unique indexes, nothing otherwise.
fn uniqueness_prefix(kind: &str) -> String {
    let kind = kind.trim();
    if kind.is_empty() {
        String::new()
    } else {
        format!("{} ", kind)
    }
}
