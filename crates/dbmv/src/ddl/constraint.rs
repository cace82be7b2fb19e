use super::{terminate, ConversionContext, GroupBuilder};
use crate::core::{GroupKey, MetadataRow};
use crate::error::Result;
use crate::template::{ForeignKeySlot, UniqueSlot};
use std::collections::VecDeque;
use tracing::debug;

/// `ON DELETE <rule>` unless the rule is empty or NO ACTION.
pub(super) fn delete_clause(rule: Option<String>) -> String {
    match rule.map(|r| r.trim().to_uppercase()) {
        Some(r) if !r.is_empty() && r != "NO ACTION" => format!("ON DELETE {}", r),
        _ => String::new(),
    }
}

/// PRIMARY KEY and UNIQUE constraints, one ALTER TABLE per constraint.
pub struct UniqueBuilder<'a> {
    ctx: &'a ConversionContext,
    open: Option<OpenUnique>,
}

struct OpenUnique {
    scname: String,
    tbname: String,
    csname: String,
    cstype: String,
    delname: String,
    columns: Vec<String>,
}

impl<'a> UniqueBuilder<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self { ctx, open: None }
    }
}

impl GroupBuilder for UniqueBuilder<'_> {
    type Output = String;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        let table = row.object();
        let column = row.text_or_empty(4);
        if !self.ctx.filter.included(&table, &column) {
            debug!("Constraint column {}.{} excluded by filter", table, column);
            return Ok(None);
        }
        Ok(Some(GroupKey::member(row.schema(), table, row.text_or_empty(2))))
    }

    fn open(&mut self, key: &GroupKey, row: &MetadataRow, _: &mut VecDeque<String>) -> Result<()> {
        let ctx = self.ctx;
        self.open = Some(OpenUnique {
            scname: ctx.quote(&ctx.schemas.target_schema(&key.schema)),
            tbname: ctx.quote(&key.object),
            csname: ctx.quote(&row.text_or_empty(2)),
            cstype: row.text_or_empty(3),
            delname: delete_clause(row.text(5)),
            columns: vec![ctx.quote(&row.text_or_empty(4))],
        });
        Ok(())
    }

    fn extend(&mut self, row: &MetadataRow) -> Result<()> {
        if let Some(open) = self.open.as_mut() {
            open.columns.push(self.ctx.quote(&row.text_or_empty(4)));
        }
        Ok(())
    }

    fn close(&mut self) -> Option<String> {
        let open = self.open.take()?;
        let stmt = self.ctx.templates.unique.render(|slot| match slot {
            UniqueSlot::Scname => open.scname.clone(),
            UniqueSlot::Tbname => open.tbname.clone(),
            UniqueSlot::Csname => open.csname.clone(),
            UniqueSlot::Cstype => open.cstype.clone(),
            UniqueSlot::Delname => open.delname.clone(),
            UniqueSlot::Clname => open.columns.join(","),
        });
        Some(terminate(&stmt, &self.ctx.options.separator))
    }
}

/// Foreign keys. The constraint name gets the table appended so it stays
/// unique on targets with schema-wide constraint namespaces.
pub struct ForeignKeyBuilder<'a> {
    ctx: &'a ConversionContext,
    open: Option<OpenForeignKey>,
}

struct OpenForeignKey {
    scname: String,
    tbname: String,
    csname: String,
    rscname: String,
    rtbname: String,
    delname: String,
    columns: Vec<String>,
    ref_columns: Vec<String>,
}

impl<'a> ForeignKeyBuilder<'a> {
    pub fn new(ctx: &'a ConversionContext) -> Self {
        Self { ctx, open: None }
    }
}

impl GroupBuilder for ForeignKeyBuilder<'_> {
    type Output = String;

    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>> {
        let table = row.object();
        let name = row.text_or_empty(2);
        let ref_table = row.text_or_empty(5);

        if table.eq_ignore_ascii_case(&ref_table) {
            debug!("Self-referencing foreign key {} on {} skipped", name, table);
            return Ok(None);
        }

        let filter = &self.ctx.filter;
        if !filter.included(&table, &row.text_or_empty(3))
            || !filter.included(&ref_table, &row.text_or_empty(6))
        {
            debug!("Foreign key {} on {} excluded by filter", name, table);
            return Ok(None);
        }
        Ok(Some(GroupKey::member(row.schema(), table, name)))
    }

    fn open(&mut self, key: &GroupKey, row: &MetadataRow, _: &mut VecDeque<String>) -> Result<()> {
        let ctx = self.ctx;
        let name = format!(
            "{}{}{}",
            row.text_or_empty(2),
            ctx.options.index_separator,
            key.object
        );
        self.open = Some(OpenForeignKey {
            scname: ctx.quote(&ctx.schemas.target_schema(&key.schema)),
            tbname: ctx.quote(&key.object),
            csname: ctx.quote(&name),
            rscname: ctx.quote(&ctx.schemas.target_schema(&row.text_or_empty(4))),
            rtbname: ctx.quote(&row.text_or_empty(5)),
            delname: delete_clause(row.text(7)),
            columns: vec![ctx.quote(&row.text_or_empty(3))],
            ref_columns: vec![ctx.quote(&row.text_or_empty(6))],
        });
        Ok(())
    }

    fn extend(&mut self, row: &MetadataRow) -> Result<()> {
        if let Some(open) = self.open.as_mut() {
            open.columns.push(self.ctx.quote(&row.text_or_empty(3)));
            open.ref_columns.push(self.ctx.quote(&row.text_or_empty(6)));
        }
        Ok(())
    }

    fn close(&mut self) -> Option<String> {
        let open = self.open.take()?;
        let stmt = self.ctx.templates.foreign_key.render(|slot| match slot {
            ForeignKeySlot::Scname => open.scname.clone(),
            ForeignKeySlot::Tbname => open.tbname.clone(),
            ForeignKeySlot::Csname => open.csname.clone(),
            ForeignKeySlot::Clname => open.columns.join(","),
            ForeignKeySlot::Rscname => open.rscname.clone(),
            ForeignKeySlot::Rtbname => open.rtbname.clone(),
            ForeignKeySlot::Rclname => open.ref_columns.join(","),
            ForeignKeySlot::Delname => open.delname.clone(),
        });
        Some(terminate(&stmt, &self.ctx.options.separator))
    }
}
