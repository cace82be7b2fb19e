use super::{placeholders, Template, TemplateSource, CREATE};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use tracing::debug;

placeholders! {
    /// Slots of the schema-creation statement.
    pub enum SchemaSlot {
        Scname => "scname",
    }
}

placeholders! {
    /// Slots of table-level statements: header, drop and truncate.
    pub enum TableSlot {
        Scname => "scname",
        Tbname => "tbname",
    }
}

placeholders! {
    /// Slots of one column line inside CREATE TABLE.
    pub enum ColumnSlot {
        Clname => "clname",
        Tyname => "tyname",
        Isnull => "isnull",
        Dfval => "dfval",
    }
}

placeholders! {
    /// Slots of the closing clause of CREATE TABLE; rendered with the first column.
    pub enum TailSlot {
        Clname => "clname",
    }
}

placeholders! {
    pub enum UniqueSlot {
        Scname => "scname",
        Tbname => "tbname",
        Csname => "csname",
        Cstype => "cstype",
        Delname => "delname",
        Clname => "clname",
    }
}

placeholders! {
    pub enum ForeignKeySlot {
        Scname => "scname",
        Tbname => "tbname",
        Csname => "csname",
        Clname => "clname",
        Rscname => "rscname",
        Rtbname => "rtbname",
        Rclname => "rclname",
        Delname => "delname",
    }
}

placeholders! {
    pub enum IndexSlot {
        Ixuniq => "ixuniq",
        Iscname => "iscname",
        Ixname => "ixname",
        Scname => "scname",
        Tbname => "tbname",
        Clname => "clname",
    }
}

placeholders! {
    /// Slots of the precondition script run on every destination connection.
    pub enum PreSlot {
        Scname => "scname",
        InsertMode => "insert_mode",
    }
}

/// Compiled target-side DDL templates.
#[derive(Debug, Clone)]
pub struct DdlTemplates {
    pub dialect: Dialect,
    pub schema: Template<SchemaSlot>,
    pub drop_table: Template<TableSlot>,
    pub table_header: Template<TableSlot>,
    pub table_column: Template<ColumnSlot>,
    pub table_tail: Template<TailSlot>,
    pub unique: Template<UniqueSlot>,
    pub foreign_key: Template<ForeignKeySlot>,
    pub index: Template<IndexSlot>,
    pub pre: Template<PreSlot>,
    pub truncate: Template<TableSlot>,
}

impl DdlTemplates {
    pub fn load(source: &dyn TemplateSource, dialect: Dialect) -> Result<Self> {
        let required = |id: &str| {
            source.template(dialect, CREATE, id).ok_or_else(|| {
                MigrateError::Template(format!("no '{}' template for target {}", id, dialect))
            })
        };
        let optional = |id: &str| source.template(dialect, CREATE, id).unwrap_or_default();

        let templates = Self {
            dialect,
            schema: Template::parse(&optional("schema"))?,
            drop_table: Template::parse(&optional("drop_table"))?,
            table_header: Template::parse(&required("table_header")?)?,
            table_column: Template::parse(&required("table_column")?)?,
            table_tail: Template::parse(&optional("table_tail"))?,
            unique: Template::parse(&required("unique")?)?,
            foreign_key: Template::parse(&required("foreign_key")?)?,
            index: Template::parse(&required("index")?)?,
            pre: Template::parse(&optional("pre"))?,
            truncate: Template::parse(&optional("truncate"))?,
        };
        debug!("Loaded DDL templates for {}", dialect);
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{BuiltinTemplates, FileTemplates};

    #[test]
    fn test_builtin_targets_load() {
        for dialect in [Dialect::Postgres, Dialect::Mysql, Dialect::Vector] {
            let templates = DdlTemplates::load(&BuiltinTemplates, dialect).unwrap();
            assert!(!templates.table_header.is_blank(), "{dialect}");
        }
    }

    #[test]
    fn test_target_without_templates_fails() {
        let err = DdlTemplates::load(&BuiltinTemplates, Dialect::Mssql).unwrap_err();
        assert!(matches!(err, MigrateError::Template(_)));
    }

    #[test]
    fn test_typo_in_override_fails_at_load() {
        let file = FileTemplates::from_yaml(
            "postgres:\n  create:\n    drop_table: 'DROP TABLE ${tablename}'\n",
        )
        .unwrap();
        let err = DdlTemplates::load(&file, Dialect::Postgres).unwrap_err();
        assert!(err.to_string().contains("tablename"));
    }

    #[test]
    fn test_vector_tail_uses_first_column() {
        let templates = DdlTemplates::load(&BuiltinTemplates, Dialect::Vector).unwrap();
        assert!(templates.table_tail.uses(TailSlot::Clname));
        let tail = templates.table_tail.render(|slot| match slot {
            TailSlot::Clname => "id".to_string(),
        });
        assert_eq!(tail, ") WITH PARTITION = (HASH ON id DEFAULT PARTITIONS)");
    }
}
