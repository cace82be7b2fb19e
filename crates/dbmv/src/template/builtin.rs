//! Built-in DDL skeletons per target and catalog queries per source.
//!
//! Catalog queries must return rows sorted by their grouping key; the DDL
//! generators never sort.

use super::source::{CREATE, SELECT};
use crate::dialect::Dialect;

pub(super) fn lookup(dialect: Dialect, category: &str, id: &str) -> Option<&'static str> {
    match category {
        CREATE => create(dialect, id),
        SELECT => select(dialect, id),
        _ => None,
    }
}

fn create(dialect: Dialect, id: &str) -> Option<&'static str> {
    let text = match (dialect, id) {
        (_, "table_header") => "CREATE TABLE ${scname}.${tbname} (",
        (_, "table_column") => "    ${clname} ${tyname} ${isnull} ${dfval}",
        (_, "drop_table") => "DROP TABLE IF EXISTS ${scname}.${tbname}",
        (_, "unique") => UNIQUE,
        (_, "foreign_key") => FOREIGN_KEY,

        (Dialect::Postgres, "schema") => "CREATE SCHEMA IF NOT EXISTS ${scname}",
        (Dialect::Postgres, "table_tail") => ")",
        (Dialect::Postgres, "index") => {
            "CREATE ${ixuniq}INDEX ${ixname} ON ${scname}.${tbname} (${clname})"
        }
        (Dialect::Postgres, "pre") => "SET search_path TO ${scname}, public",
        (Dialect::Postgres, "truncate") => "TRUNCATE TABLE ${scname}.${tbname}",

        (Dialect::Mysql, "schema") => "CREATE DATABASE IF NOT EXISTS ${scname}",
        (Dialect::Mysql, "table_tail") => ")",
        (Dialect::Mysql, "index") => {
            "CREATE ${ixuniq}INDEX ${ixname} ON ${scname}.${tbname} (${clname})"
        }
        (Dialect::Mysql, "pre") => "",
        (Dialect::Mysql, "truncate") => "TRUNCATE TABLE ${scname}.${tbname}",

        (Dialect::Vector, "schema") => "CREATE SCHEMA AUTHORIZATION ${scname}",
        (Dialect::Vector, "table_tail") => {
            ") WITH PARTITION = (HASH ON ${clname} DEFAULT PARTITIONS)"
        }
        (Dialect::Vector, "index") => {
            "CREATE ${ixuniq}INDEX ${iscname}.${ixname} ON ${scname}.${tbname} (${clname})"
        }
        (Dialect::Vector, "pre") => "SET INSERTMODE ${insert_mode}",
        (Dialect::Vector, "truncate") => "MODIFY ${scname}.${tbname} TO TRUNCATED",

        _ => return None,
    };
    Some(text)
}

const UNIQUE: &str =
    "ALTER TABLE ${scname}.${tbname} ADD CONSTRAINT ${csname} ${cstype} (${clname})";

const FOREIGN_KEY: &str = "ALTER TABLE ${scname}.${tbname} ADD CONSTRAINT ${csname} \
     FOREIGN KEY (${clname}) REFERENCES ${rscname}.${rtbname} (${rclname}) ${delname}";

fn select(dialect: Dialect, id: &str) -> Option<&'static str> {
    let text = match (dialect, id) {
        (Dialect::Mssql, "tables") => MSSQL_TABLES,
        (Dialect::Mssql, "uniques") => MSSQL_UNIQUES,
        (Dialect::Mssql, "foreign_keys") => MSSQL_FOREIGN_KEYS,
        (Dialect::Mssql, "indexes") => MSSQL_INDEXES,
        (Dialect::Mssql, "views") => MSSQL_VIEWS,
        (Dialect::Postgres, "tables") => PG_TABLES,
        (Dialect::Postgres, "uniques") => PG_UNIQUES,
        (Dialect::Postgres, "foreign_keys") => PG_FOREIGN_KEYS,
        (Dialect::Postgres, "indexes") => PG_INDEXES,
        (Dialect::Postgres, "views") => PG_VIEWS,
        _ => return None,
    };
    Some(text)
}

const MSSQL_TABLES: &str = r#"
SELECT s.name, t.name, c.name, UPPER(ty.name),
       CASE WHEN ty.name IN ('nvarchar', 'nchar') AND c.max_length > 0 THEN c.max_length / 2
            WHEN ty.name IN ('decimal', 'numeric', 'float', 'real') THEN c.precision
            ELSE c.max_length END,
       c.scale,
       CASE WHEN c.is_nullable = 0 THEN 'NOT NULL' ELSE '' END,
       CASE WHEN c.is_identity = 1 THEN 'IDENTITY(1,1)' ELSE dc.definition END
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.columns c ON c.object_id = t.object_id
JOIN sys.types ty ON ty.user_type_id = c.user_type_id
LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
WHERE t.is_ms_shipped = 0
  AND ('${schema_filter}' = '' OR s.name = '${schema_filter}')
  AND LOWER(ty.name) NOT IN ('${types_to_skip}')
ORDER BY s.name, t.name, c.column_id
"#;

const MSSQL_UNIQUES: &str = r#"
SELECT s.name, t.name, kc.name,
       CASE kc.type WHEN 'PK' THEN 'PRIMARY KEY' ELSE 'UNIQUE' END,
       c.name, NULL
FROM sys.key_constraints kc
JOIN sys.tables t ON t.object_id = kc.parent_object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.index_columns ic ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE t.is_ms_shipped = 0
  AND ('${schema_filter}' = '' OR s.name = '${schema_filter}')
ORDER BY s.name, t.name, kc.name, ic.key_ordinal
"#;

const MSSQL_FOREIGN_KEYS: &str = r#"
SELECT s.name, t.name, fk.name, pc.name, rs.name, rt.name, rc.name,
       REPLACE(fk.delete_referential_action_desc, '_', ' ')
FROM sys.foreign_keys fk
JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.tables t ON t.object_id = fk.parent_object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE ('${schema_filter}' = '' OR s.name = '${schema_filter}')
ORDER BY s.name, t.name, fk.name, fkc.constraint_column_id
"#;

const MSSQL_INDEXES: &str = r#"
SELECT s.name, t.name, s.name, i.name,
       CASE WHEN i.type IN (1, 2) THEN 'BTREE' ELSE i.type_desc END,
       CASE WHEN i.is_unique = 1 THEN 'UNIQUE' ELSE '' END,
       c.name
FROM sys.indexes i
JOIN sys.tables t ON t.object_id = i.object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE i.is_primary_key = 0 AND i.is_unique_constraint = 0 AND i.name IS NOT NULL
  AND t.is_ms_shipped = 0
  AND ('${schema_filter}' = '' OR s.name = '${schema_filter}')
ORDER BY s.name, t.name, i.name, ic.key_ordinal
"#;

const MSSQL_VIEWS: &str = r#"
SELECT s.name, v.name, m.definition
FROM sys.views v
JOIN sys.schemas s ON s.schema_id = v.schema_id
JOIN sys.sql_modules m ON m.object_id = v.object_id
WHERE v.is_ms_shipped = 0
  AND ('${schema_filter}' = '' OR s.name = '${schema_filter}')
ORDER BY s.name, v.name
"#;

const PG_TABLES: &str = r#"
SELECT c.table_schema, c.table_name, c.column_name, UPPER(c.data_type),
       COALESCE(c.character_maximum_length, c.numeric_precision, 0),
       COALESCE(c.numeric_scale, c.datetime_precision, 0),
       CASE WHEN c.is_nullable = 'NO' THEN 'NOT NULL' ELSE '' END,
       c.column_default
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name AND t.table_type = 'BASE TABLE'
WHERE c.table_schema NOT IN ('pg_catalog', 'information_schema')
  AND ('${schema_filter}' = '' OR c.table_schema = '${schema_filter}')
  AND LOWER(c.data_type) NOT IN ('${types_to_skip}')
ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

const PG_UNIQUES: &str = r#"
SELECT tc.table_schema, tc.table_name, tc.constraint_name, tc.constraint_type,
       kcu.column_name, NULL
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
  AND tc.table_schema NOT IN ('pg_catalog', 'information_schema')
  AND ('${schema_filter}' = '' OR tc.table_schema = '${schema_filter}')
ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, kcu.ordinal_position
"#;

const PG_FOREIGN_KEYS: &str = r#"
SELECT ns.nspname, cl.relname, con.conname, att.attname,
       rns.nspname, rcl.relname, ratt.attname,
       CASE con.confdeltype WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET NULL'
            WHEN 'd' THEN 'SET DEFAULT' WHEN 'r' THEN 'RESTRICT' ELSE 'NO ACTION' END
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = cl.relnamespace
JOIN pg_class rcl ON rcl.oid = con.confrelid
JOIN pg_namespace rns ON rns.oid = rcl.relnamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
JOIN pg_attribute ratt ON ratt.attrelid = con.confrelid AND ratt.attnum = k.refnum
WHERE con.contype = 'f'
  AND ns.nspname NOT IN ('pg_catalog', 'information_schema')
  AND ('${schema_filter}' = '' OR ns.nspname = '${schema_filter}')
ORDER BY ns.nspname, cl.relname, con.conname, k.ord
"#;

const PG_INDEXES: &str = r#"
SELECT ns.nspname, t.relname, ns.nspname, i.relname, UPPER(am.amname),
       CASE WHEN ix.indisunique THEN 'UNIQUE' ELSE '' END,
       a.attname
FROM pg_index ix
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_namespace ns ON ns.oid = t.relnamespace
JOIN pg_am am ON am.oid = i.relam
CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE NOT ix.indisprimary
  AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = ix.indexrelid AND c.contype = 'u')
  AND ns.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
  AND ('${schema_filter}' = '' OR ns.nspname = '${schema_filter}')
ORDER BY ns.nspname, t.relname, i.relname, k.ord
"#;

const PG_VIEWS: &str = r#"
SELECT schemaname, viewname,
       'CREATE VIEW ' || quote_ident(schemaname) || '.' || quote_ident(viewname) || ' AS ' || definition
FROM pg_views
WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
  AND ('${schema_filter}' = '' OR schemaname = '${schema_filter}')
ORDER BY schemaname, viewname
"#;
