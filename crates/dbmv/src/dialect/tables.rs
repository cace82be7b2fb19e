//! Built-in translation tables, one per supported dialect pair.

use super::profile::{DefaultRule, TypeRule};
use super::Dialect;

pub(super) struct PairData {
    pub source: Dialect,
    pub target: Dialect,
    pub types: &'static [(&'static str, TypeRule)],
    pub unsupported: &'static [&'static str],
    pub defaults: &'static [DefaultRule],
    pub identity_clause: &'static str,
    pub view_rewrites: &'static [(&'static str, &'static str)],
}

pub(super) fn pair(source: Dialect, target: Dialect) -> Option<&'static PairData> {
    PAIRS
        .iter()
        .find(|p| p.source == source && p.target == target)
}

const fn rule(
    declaration: &'static str,
    select_cast: &'static str,
    insert_cast: &'static str,
) -> TypeRule {
    TypeRule::new(declaration, select_cast, insert_cast)
}

pub(super) static PAIRS: &[PairData] = &[
    PairData {
        source: Dialect::Mssql,
        target: Dialect::Postgres,
        types: MSSQL_TO_POSTGRES,
        unsupported: &[],
        defaults: MSSQL_DEFAULTS,
        identity_clause: "GENERATED BY DEFAULT AS IDENTITY",
        view_rewrites: &[("[", "\""), ("]", "\""), ("WITH SCHEMABINDING", "")],
    },
    PairData {
        source: Dialect::Mssql,
        target: Dialect::Mysql,
        types: MSSQL_TO_MYSQL,
        unsupported: &[],
        defaults: MSSQL_DEFAULTS,
        identity_clause: "AUTO_INCREMENT",
        view_rewrites: &[("[", "`"), ("]", "`"), ("WITH SCHEMABINDING", "")],
    },
    PairData {
        source: Dialect::Mssql,
        target: Dialect::Vector,
        types: MSSQL_TO_VECTOR,
        unsupported: &[
            "image",
            "hierarchyid",
            "geometry",
            "geography",
            "varbinary",
            "binary",
            "xml",
        ],
        defaults: MSSQL_DEFAULTS,
        identity_clause: "GENERATED BY DEFAULT AS IDENTITY",
        view_rewrites: &[
            ("[", "\""),
            ("]", "\""),
            ("CONVERT(money", "money"),
            ("(money,(", "((money("),
            ("0101", "-01-01"),
            ("1231", "-12-31"),
            ("WITH SCHEMABINDING", ""),
        ],
    },
    PairData {
        source: Dialect::Postgres,
        target: Dialect::Vector,
        types: POSTGRES_TO_VECTOR,
        unsupported: &[],
        defaults: &[
            DefaultRule {
                prefix: "nextval(",
                replacement: "",
            },
            DefaultRule {
                prefix: "now(",
                replacement: "DEFAULT CURRENT_TIMESTAMP",
            },
        ],
        identity_clause: "GENERATED BY DEFAULT AS IDENTITY",
        view_rewrites: &[],
    },
];

static MSSQL_DEFAULTS: &[DefaultRule] = &[
    DefaultRule {
        prefix: "newid(",
        replacement: "",
    },
    DefaultRule {
        prefix: "newsequentialid(",
        replacement: "",
    },
    DefaultRule {
        prefix: "getdate(",
        replacement: "DEFAULT CURRENT_TIMESTAMP",
    },
    DefaultRule {
        prefix: "sysdatetime(",
        replacement: "DEFAULT CURRENT_TIMESTAMP",
    },
];

static MSSQL_TO_POSTGRES: &[(&str, TypeRule)] = &[
    ("INT", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("BIGINT", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("SMALLINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("TINYINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("NUMERIC", rule("NUMERIC(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("DECIMAL", rule("DECIMAL(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("MONEY", rule("DOUBLE PRECISION", "<COLNAME>", "<VALUE>")),
    ("SMALLMONEY", rule("MONEY", "<COLNAME>", "<VALUE>")),
    ("FLOAT", rule("DOUBLE PRECISION", "<COLNAME>", "'<VALUE>'")),
    ("REAL", rule("REAL", "<COLNAME>", "'<VALUE>'")),
    ("BIT", rule("BOOLEAN", "<COLNAME>", "<VALUE>")),
    (
        "DATETIME",
        rule("TIMESTAMP", "CONVERT(VARCHAR,<COLNAME>,121)", "'<VALUE>'"),
    ),
    (
        "DATETIME2",
        rule("TIMESTAMP", "CONVERT(VARCHAR,<COLNAME>,121)", "'<VALUE>'"),
    ),
    (
        "SMALLDATETIME",
        rule("TIMESTAMP", "CONVERT(VARCHAR,<COLNAME>,120)", "'<VALUE>'"),
    ),
    ("DATE", rule("DATE", "CONVERT(VARCHAR,<COLNAME>,23)", "'<VALUE>'")),
    ("TIME", rule("TIME", "CONVERT(VARCHAR,<COLNAME>,114)", "'<VALUE>'")),
    (
        "DATETIMEOFFSET",
        rule(
            "TIMESTAMP WITH TIME ZONE",
            "CONVERT(VARCHAR,<COLNAME>,127)",
            "'<VALUE>'",
        ),
    ),
    ("CHAR", rule("CHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "NCHAR",
        rule("CHAR(<PRECISION>)", "CAST(<COLNAME> AS NVARCHAR(MAX))", "'<VALUE>'"),
    ),
    ("VARCHAR", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "NVARCHAR",
        rule("VARCHAR(<PRECISION>)", "CAST(<COLNAME> AS TEXT)", "'<VALUE>'"),
    ),
    ("TEXT", rule("TEXT", "<COLNAME>", "'<VALUE>'")),
    (
        "NTEXT",
        rule("TEXT", "CAST(<COLNAME> AS NVARCHAR(MAX))", "'<VALUE>'"),
    ),
    ("UNIQUEIDENTIFIER", rule("VARCHAR(64)", "<COLNAME>", "'<VALUE>'")),
    (
        "BINARY",
        rule("BYTEA", "'\\x' + CONVERT(VARCHAR(MAX),<COLNAME>,2)", "'<VALUE>'"),
    ),
    (
        "VARBINARY",
        rule("BYTEA", "'\\x' + CONVERT(VARCHAR(MAX),<COLNAME>,2)", "'<VALUE>'"),
    ),
    (
        "XML",
        rule("TEXT", "CAST(<COLNAME> AS VARCHAR(8000))", "'<VALUE>'"),
    ),
];

static MSSQL_TO_MYSQL: &[(&str, TypeRule)] = &[
    ("INT", rule("INT", "<COLNAME>", "<VALUE>")),
    ("BIGINT", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("SMALLINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("TINYINT", rule("TINYINT UNSIGNED", "<COLNAME>", "<VALUE>")),
    ("NUMERIC", rule("NUMERIC(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("DECIMAL", rule("DECIMAL(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("MONEY", rule("DOUBLE", "<COLNAME>", "<VALUE>")),
    ("SMALLMONEY", rule("FLOAT", "<COLNAME>", "<VALUE>")),
    ("FLOAT", rule("DOUBLE", "<COLNAME>", "'<VALUE>'")),
    ("BIT", rule("BIT(1)", "<COLNAME>", "<VALUE>")),
    (
        "DATETIME",
        rule("DATETIME(3)", "CONVERT(VARCHAR,<COLNAME>,121)", "'<VALUE>'"),
    ),
    (
        "SMALLDATETIME",
        rule("DATETIME", "CONVERT(VARCHAR,<COLNAME>,120)", "'<VALUE>'"),
    ),
    ("DATE", rule("DATE", "CONVERT(VARCHAR,<COLNAME>,23)", "'<VALUE>'")),
    ("CHAR", rule("CHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "NCHAR",
        rule(
            "NCHAR(<PRECISION>) CHARACTER SET UTF8",
            "CAST(<COLNAME> AS NVARCHAR(MAX))",
            "'<VALUE>'",
        ),
    ),
    ("VARCHAR", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "NVARCHAR",
        rule(
            "VARCHAR(<PRECISION>) CHARACTER SET UTF8",
            "CAST(<COLNAME> AS NVARCHAR(MAX))",
            "'<VALUE>'",
        ),
    ),
    ("TEXT", rule("LONGTEXT", "<COLNAME>", "'<VALUE>'")),
    ("UNIQUEIDENTIFIER", rule("VARCHAR(64)", "<COLNAME>", "'<VALUE>'")),
    (
        "BINARY",
        rule("BINARY(<PRECISION>)", "CONVERT(VARCHAR(MAX),<COLNAME>,1)", "<VALUE>"),
    ),
    (
        "VARBINARY",
        rule("VARBINARY(<PRECISION>)", "CONVERT(VARCHAR(MAX),<COLNAME>,1)", "<VALUE>"),
    ),
    (
        "XML",
        rule("TEXT", "CAST(<COLNAME> AS VARCHAR(8000))", "'<VALUE>'"),
    ),
];

static MSSQL_TO_VECTOR: &[(&str, TypeRule)] = &[
    ("INT", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("INTEGER", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("NUMERIC", rule("NUMERIC(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("DECIMAL", rule("DECIMAL(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("SMALLMONEY", rule("DECIMAL(10,4)", "<COLNAME>", "<VALUE>")),
    ("MONEY", rule("DECIMAL(19,4)", "<COLNAME>", "<VALUE>")),
    ("TINYINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("SMALLINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("BIGINT", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("FLOAT", rule("FLOAT(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("REAL", rule("FLOAT(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("ROWVERSION", rule("BIGINT", "<COLNAME>", "'<VALUE>'")),
    ("TIMESTAMP", rule("BIGINT", "<COLNAME>", "'<VALUE>'")),
    (
        "DATETIME",
        rule("TIMESTAMP", "CONVERT(VARCHAR,<COLNAME>,121)", "'<VALUE>'"),
    ),
    (
        "SMALLDATETIME",
        rule("TIMESTAMP(0)", "CONVERT(VARCHAR,<COLNAME>,120)", "'<VALUE>'"),
    ),
    ("TIME", rule("TIME", "CONVERT(VARCHAR,<COLNAME>,120)", "'<VALUE>'")),
    ("DATE", rule("ANSIDATE", "CONVERT(VARCHAR,<COLNAME>,120)", "'<VALUE>'")),
    ("NCHAR", rule("NCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("CHAR", rule("CHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("NVARCHAR", rule("NVARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("VARCHAR", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "TEXT",
        rule("VARCHAR(4000)", "CAST(<COLNAME> AS VARCHAR(4000))", "'<VALUE>'"),
    ),
    (
        "NTEXT",
        rule("NVARCHAR(4000)", "CAST(<COLNAME> AS NVARCHAR(4000))", "'<VALUE>'"),
    ),
    ("UNIQUEIDENTIFIER", rule("UUID", "<COLNAME>", "'<VALUE>'")),
    (
        "BINARY",
        rule(
            "BINARY(<PRECISION>)",
            "CAST(<COLNAME> AS NVARCHAR(4000))",
            "'<VALUE>'",
        ),
    ),
    (
        "VARBINARY",
        rule(
            "CHARACTER VARYING(4000)",
            "CASE WHEN <COLNAME> IS NOT NULL THEN '--IMAGE--' END",
            "'<VALUE>'",
        ),
    ),
    ("IMAGE", rule("LONG BYTE", "<COLNAME>", "<VALUE>")),
    ("BIT", rule("TINYINT", "CAST(<COLNAME> AS TINYINT)", "<VALUE>")),
    (
        "XML",
        rule("NVARCHAR(4000)", "CAST(<COLNAME> AS NVARCHAR(4000))", "'<VALUE>'"),
    ),
    (
        "HIERARCHYID",
        rule("NVARCHAR(4000)", "CAST(<COLNAME> AS NVARCHAR(4000))", "'<VALUE>'"),
    ),
    (
        "GEOMETRY",
        rule("NVARCHAR(4000)", "CAST(<COLNAME> AS NVARCHAR(4000))", "'<VALUE>'"),
    ),
    (
        "GEOGRAPHY",
        rule("NVARCHAR(4000)", "CAST(<COLNAME> AS NVARCHAR(4000))", "'<VALUE>'"),
    ),
];

static POSTGRES_TO_VECTOR: &[(&str, TypeRule)] = &[
    ("INT", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("INT4", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("INTEGER", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("SERIAL", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("SERIAL4", rule("INTEGER", "<COLNAME>", "<VALUE>")),
    ("NUMERIC", rule("DECIMAL(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("DECIMAL", rule("DECIMAL(<PRECISION>,<SCALE>)", "<COLNAME>", "<VALUE>")),
    ("MONEY", rule("DECIMAL(19,4)", "<COLNAME>::numeric", "<VALUE>")),
    ("SMALLINT", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("INT2", rule("SMALLINT", "<COLNAME>", "<VALUE>")),
    ("BIGINT", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("INT8", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("BIGSERIAL", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("SERIAL8", rule("BIGINT", "<COLNAME>", "<VALUE>")),
    ("DOUBLE PRECISION", rule("FLOAT8", "<COLNAME>", "<VALUE>")),
    ("FLOAT8", rule("FLOAT8", "<COLNAME>", "<VALUE>")),
    ("FLOAT4", rule("FLOAT4", "<COLNAME>", "'<VALUE>'")),
    ("REAL", rule("FLOAT4", "<COLNAME>", "'<VALUE>'")),
    ("TIMESTAMP", rule("TIMESTAMP", "<COLNAME>", "'<VALUE>'")),
    (
        "TIMESTAMP WITHOUT TIME ZONE",
        rule("TIMESTAMP", "<COLNAME>", "'<VALUE>'"),
    ),
    (
        "TIMESTAMP WITH TIME ZONE",
        rule("TIMESTAMP WITH TIME ZONE", "<COLNAME>", "'<VALUE>'"),
    ),
    (
        "TIMESTAMPTZ",
        rule("TIMESTAMP WITH TIME ZONE", "<COLNAME>", "'<VALUE>'"),
    ),
    ("DATE", rule("ANSIDATE", "<COLNAME>", "'<VALUE>'")),
    ("TIME", rule("TIME(<SCALE>)", "<COLNAME>", "'<VALUE>'")),
    (
        "TIME WITHOUT TIME ZONE",
        rule("TIME(<SCALE>)", "<COLNAME>", "'<VALUE>'"),
    ),
    (
        "TIME WITH TIME ZONE",
        rule("TIME(<SCALE>) WITH TIME ZONE", "<COLNAME>", "'<VALUE>'"),
    ),
    (
        "TIMETZ",
        rule("TIME(<SCALE>) WITH TIME ZONE", "<COLNAME>", "'<VALUE>'"),
    ),
    ("INTERVAL", rule("INTERVAL", "<COLNAME>", "'<VALUE>'")),
    ("CHAR", rule("CHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("CHARACTER", rule("CHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("VARCHAR", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    (
        "CHARACTER VARYING",
        rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'"),
    ),
    ("TEXT", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("BYTEA", rule("VARCHAR(<PRECISION>)", "<COLNAME>", "'<VALUE>'")),
    ("UUID", rule("UUID", "<COLNAME>", "'<VALUE>'")),
    ("BOOLEAN", rule("BOOLEAN", "UPPER(<COLNAME>::text)", "<VALUE>")),
    ("BOOL", rule("BOOLEAN", "UPPER(<COLNAME>::text)", "<VALUE>")),
    ("BIT", rule("BOOLEAN", "<COLNAME> = B'1'", "<VALUE>")),
    (
        "XML",
        rule("CLOB", "CAST(<COLNAME> AS VARCHAR(8000))", "'<VALUE>'"),
    ),
];
