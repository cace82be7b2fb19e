//! Dialects and per-pair translation profiles.
//!
//! A [`PairProfile`] bundles everything that depends on the (source, target)
//! combination: the type table, the types known to be unsupported, default
//! and auto-increment rewrites, and the literal replacements applied to view
//! bodies. Profiles are static data selected once at startup:
//!
//! ```rust,ignore
//! let profile = PairProfile::select(Dialect::Mssql, Dialect::Postgres)?;
//! let rule = profile.types().lookup("datetime")?;
//! assert_eq!(rule.declaration(0, 0), "TIMESTAMP");
//! ```

mod profile;
mod tables;

pub use profile::{DefaultRule, PairProfile, TypeMapping, TypeRule};

use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A database product's SQL and type conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mssql,
    Postgres,
    Mysql,
    Vector,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Mssql,
        Dialect::Postgres,
        Dialect::Mysql,
        Dialect::Vector,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Mssql => "mssql",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Vector => "vector",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Dialect::Mssql => 1433,
            Dialect::Postgres => 5432,
            Dialect::Mysql => 3306,
            Dialect::Vector => 27832,
        }
    }

    pub fn default_database(self) -> &'static str {
        match self {
            Dialect::Mssql => "master",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Vector => "iidbdb",
        }
    }

    /// Infix used to make index and foreign-key names unique per table.
    pub fn index_separator(self) -> &'static str {
        match self {
            Dialect::Vector => "_x100_",
            _ => "_ax11_",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(Dialect::Mssql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::Mysql),
            "vector" | "vectorwise" | "vw" => Ok(Dialect::Vector),
            other => Err(MigrateError::Config(format!(
                "unknown dialect '{}' (expected one of: mssql, postgres, mysql, vector)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("vw".parse::<Dialect>().unwrap(), Dialect::Vector);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_round_trip_names() {
        for d in Dialect::ALL {
            assert_eq!(d.name().parse::<Dialect>().unwrap(), d);
        }
    }

    #[test]
    fn test_index_separator() {
        assert_eq!(Dialect::Vector.index_separator(), "_x100_");
        assert_eq!(Dialect::Postgres.index_separator(), "_ax11_");
    }
}
