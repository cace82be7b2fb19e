//! DDL generation from sorted catalog rows.
//!
//! Every generator is a [`Grouped`] iterator driving a [`GroupBuilder`]. The
//! driver compares each row's [`GroupKey`] with the previous one only: when
//! the key changes, the open group is closed and emitted before the new one
//! opens, and the last group is flushed when the input runs out. Input must
//! already be sorted by key; nothing here sorts or buffers more than the
//! group being built.

mod constraint;
mod context;
mod index;
mod table;
mod view;

pub use constraint::{ForeignKeyBuilder, UniqueBuilder};
pub use context::{ColumnPolicy, ColumnSpec, ConversionContext, DdlOptions};
pub use index::IndexBuilder;
pub use table::TableBuilder;
pub use view::ViewBuilder;

use crate::core::{GroupKey, MetadataRow};
use crate::error::Result;
use std::collections::VecDeque;

/// One kind of grouped output (tables, constraints, views, copy jobs...).
pub trait GroupBuilder {
    type Output;

    /// Classify a row. `Ok(None)` drops it from the stream.
    fn accept(&mut self, row: &MetadataRow) -> Result<Option<GroupKey>>;

    /// Start a group with its first row. Preamble output (schema creation,
    /// drop statements) goes to `out` ahead of the group itself.
    fn open(
        &mut self,
        key: &GroupKey,
        row: &MetadataRow,
        out: &mut VecDeque<Self::Output>,
    ) -> Result<()>;

    /// Add a further row to the open group.
    fn extend(&mut self, row: &MetadataRow) -> Result<()>;

    /// Finish the open group, if any.
    fn close(&mut self) -> Option<Self::Output>;
}

/// Lazy grouping driver. Fuses after the first error.
pub struct Grouped<I, B: GroupBuilder> {
    rows: I,
    builder: B,
    previous: Option<GroupKey>,
    pending: VecDeque<B::Output>,
    done: bool,
}

impl<I, B> Grouped<I, B>
where
    I: Iterator<Item = MetadataRow>,
    B: GroupBuilder,
{
    pub fn new<R>(rows: R, builder: B) -> Self
    where
        R: IntoIterator<IntoIter = I>,
    {
        Self {
            rows: rows.into_iter(),
            builder,
            previous: None,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn step(&mut self, row: &MetadataRow) -> Result<()> {
        let Some(key) = self.builder.accept(row)? else {
            return Ok(());
        };

        if self.previous.as_ref() == Some(&key) {
            return self.builder.extend(row);
        }

        if let Some(finished) = self.builder.close() {
            self.pending.push_back(finished);
        }
        self.builder.open(&key, row, &mut self.pending)?;
        self.previous = Some(key);
        Ok(())
    }
}

impl<I, B> Iterator for Grouped<I, B>
where
    I: Iterator<Item = MetadataRow>,
    B: GroupBuilder,
{
    type Item = Result<B::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(out) = self.pending.pop_front() {
                return Some(Ok(out));
            }
            if self.done {
                return None;
            }
            match self.rows.next() {
                Some(row) => {
                    if let Err(e) = self.step(&row) {
                        self.done = true;
                        self.pending.clear();
                        return Some(Err(e));
                    }
                }
                None => {
                    self.done = true;
                    if let Some(last) = self.builder.close() {
                        self.pending.push_back(last);
                    }
                }
            }
        }
    }
}

/// Append the command separator and newline to a statement.
pub fn terminate(statement: &str, separator: &str) -> String {
    format!("{}{}\n", statement.trim_end(), separator)
}

/// Split generated DDL back into executable statements.
pub fn split_statements<'a>(ddl: &'a str, separator: &str) -> Vec<&'a str> {
    let boundary = format!("{}\n", separator);
    ddl.split(boundary.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// CREATE TABLE statements, preceded by schema and optional drop statements.
pub fn tables<'a, R>(rows: R, ctx: &'a ConversionContext) -> Grouped<R::IntoIter, TableBuilder<'a>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, TableBuilder::new(ctx))
}

/// Primary-key and unique constraints.
pub fn uniques<'a, R>(rows: R, ctx: &'a ConversionContext) -> Grouped<R::IntoIter, UniqueBuilder<'a>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, UniqueBuilder::new(ctx))
}

pub fn foreign_keys<'a, R>(
    rows: R,
    ctx: &'a ConversionContext,
) -> Grouped<R::IntoIter, ForeignKeyBuilder<'a>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, ForeignKeyBuilder::new(ctx))
}

pub fn indexes<'a, R>(rows: R, ctx: &'a ConversionContext) -> Grouped<R::IntoIter, IndexBuilder<'a>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, IndexBuilder::new(ctx))
}

pub fn views<'a, R>(rows: R, ctx: &'a ConversionContext) -> Grouped<R::IntoIter, ViewBuilder<'a>>
where
    R: IntoIterator<Item = MetadataRow>,
{
    Grouped::new(rows, ViewBuilder::new(ctx))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::SqlValue;
    use crate::dialect::{Dialect, PairProfile};
    use crate::filter::{SchemaMapper, TableFilter};
    use crate::template::{BuiltinTemplates, DdlTemplates};

    /// Catalog row from strings; `"NULL"` becomes SQL NULL.
    pub fn row(values: &[&str]) -> MetadataRow {
        MetadataRow::new(
            values
                .iter()
                .map(|v| {
                    if *v == "NULL" {
                        SqlValue::Null
                    } else {
                        SqlValue::from(*v)
                    }
                })
                .collect(),
        )
    }

    pub fn context(source: Dialect, target: Dialect) -> ConversionContext {
        ConversionContext {
            profile: PairProfile::select(source, target).unwrap(),
            templates: DdlTemplates::load(&BuiltinTemplates, target).unwrap(),
            filter: TableFilter::allow_all(),
            schemas: SchemaMapper::default(),
            options: DdlOptions {
                index_separator: target.index_separator().to_string(),
                ..DdlOptions::default()
            },
        }
    }

    pub fn collect<I: Iterator<Item = Result<String>>>(iter: I) -> Vec<String> {
        iter.map(|r| r.unwrap()).collect()
    }
}
