//! Configuration type definitions.

use crate::dialect::Dialect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use sysinfo::System;
use tracing::info;

/// Upper bound on worker slots.
pub const MAX_THREADS: usize = 32;

/// System resource information used by the `multitable` load method.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in GB.
    pub total_memory_gb: f64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            total_memory_gb: sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
            cpu_cores: sys.cpus().len(),
        }
    }

    pub fn log(&self) {
        info!(
            "System resources: {:.1} GB RAM, {} CPU cores",
            self.total_memory_gb, self.cpu_cores
        );
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the catalog and data are read from.
    pub source: EndpointConfig,

    /// Database the DDL and data are written to.
    pub target: EndpointConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Optional YAML file overriding built-in templates.
    #[serde(default)]
    pub templates: Option<PathBuf>,
}

/// One database endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub dialect: Dialect,

    #[serde(default = "default_host")]
    pub host: String,

    /// 0 selects the dialect's default port.
    #[serde(default)]
    pub port: u16,

    /// Empty selects the dialect's default database.
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Schema to read (source) or default schema (target); unset means all.
    #[serde(default)]
    pub schema: Option<String>,
}

impl EndpointConfig {
    /// Fill in the dialect's port and database where unset.
    pub fn with_defaults(mut self) -> Self {
        if self.port == 0 {
            self.port = self.dialect.default_port();
        }
        if self.database.trim().is_empty() {
            self.database = self.dialect.default_database().to_string();
        }
        self
    }

    /// Schema filter for catalog queries; empty matches every schema.
    pub fn schema_filter(&self) -> &str {
        self.schema.as_deref().unwrap_or_default()
    }

    /// Copy with the password masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "********".to_string();
        }
        copy
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"********")
            .field("schema", &self.schema)
            .finish()
    }
}

/// `dialect://user@host:port/database`, never the password.
impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.dialect)?;
        if !self.user.is_empty() {
            write!(f, "{}@", self.user)?;
        }
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Rows per INSERT batch.
    pub batch_size: usize,

    /// Ceiling on rows loaded across all tables.
    pub max_rows: u64,

    /// Worker slots; overridden by `load_method` when set.
    pub threads: usize,

    pub load_method: Option<LoadMethod>,

    /// `TABLE` or `TABLE.COLUMN` entries to keep.
    pub include: Vec<String>,

    /// `TABLE` or `TABLE.COLUMN` entries to drop.
    pub exclude: Vec<String>,

    pub truncate: bool,

    /// Run everything but send no mutating statement to the target.
    pub trial: bool,

    pub continue_on_error: bool,

    /// Warn and skip columns of unmapped types instead of failing.
    pub skip_unsupported: bool,

    /// Emit DROP TABLE before each CREATE TABLE.
    pub add_drop: bool,

    /// Identifier quote character for generated DDL; unset means bare names.
    pub quote: Option<String>,

    pub command_separator: String,

    /// Field delimiter for unload files.
    pub field_delimiter: String,

    /// Replacement for missing precision, and the largest precision kept.
    pub charmax: i64,

    /// Put every object into this schema.
    pub target_schema: Option<String>,

    /// Schema translation table, `scname:from,to,...;iscname:from,to`.
    pub translation: Option<String>,

    /// Vector insert mode, BULK or ROW.
    pub insert_mode: String,

    /// Joins constraint/index names to their table; defaults per target.
    pub index_separator: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_rows: 100_000,
            threads: 1,
            load_method: None,
            include: Vec::new(),
            exclude: Vec::new(),
            truncate: false,
            trial: false,
            continue_on_error: false,
            skip_unsupported: false,
            add_drop: false,
            quote: None,
            command_separator: ";".to_string(),
            field_delimiter: "\t".to_string(),
            charmax: 6400,
            target_schema: None,
            translation: None,
            insert_mode: "BULK".to_string(),
            index_separator: None,
        }
    }
}

impl MigrationConfig {
    /// Worker slots after applying the load-method preset.
    pub fn effective_threads(&self) -> usize {
        match self.load_method {
            Some(method) => method.threads(),
            None => self.threads,
        }
    }
}

/// Thread-count presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMethod {
    Serial,
    Parallel,
    /// One worker per CPU core.
    Multitable,
}

impl LoadMethod {
    pub fn threads(self) -> usize {
        match self {
            LoadMethod::Serial => 1,
            LoadMethod::Parallel => 4,
            LoadMethod::Multitable => {
                let resources = SystemResources::detect();
                resources.log();
                resources.cpu_cores.clamp(1, MAX_THREADS)
            }
        }
    }
}

impl std::str::FromStr for LoadMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(LoadMethod::Serial),
            "parallel" => Ok(LoadMethod::Parallel),
            "multitable" => Ok(LoadMethod::Multitable),
            other => Err(format!(
                "unknown load method '{}', expected serial, parallel or multitable",
                other
            )),
        }
    }
}

/// Where generated files go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,

    /// File name prefix for DDL files.
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "dbmv".to_string(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
