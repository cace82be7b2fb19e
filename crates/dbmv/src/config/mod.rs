//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::core::Quoter;
use crate::ddl::DdlOptions;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use crate::filter::{parse_translation, SchemaMapper, TableFilter};
use crate::template::{BuiltinTemplates, FileTemplates, TemplateSource};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        let config = config.with_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Fill in per-dialect endpoint defaults.
    pub fn with_defaults(mut self) -> Self {
        self.source = self.source.with_defaults();
        self.target = self.target.with_defaults();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Copy with passwords masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.source = self.source.redacted();
        copy.target = self.target.redacted();
        copy
    }

    /// Effective settings as YAML, passwords masked.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.redacted())?)
    }

    pub fn table_filter(&self) -> Result<TableFilter> {
        TableFilter::new(&self.migration.include, &self.migration.exclude)
    }

    pub fn schema_mapper(&self) -> Result<SchemaMapper> {
        let translations = match self.migration.translation.as_deref() {
            Some(spec) if !spec.trim().is_empty() => parse_translation(spec)?,
            _ => Default::default(),
        };
        Ok(SchemaMapper::new(
            self.migration.target_schema.clone(),
            translations,
        ))
    }

    pub fn ddl_options(&self) -> DdlOptions {
        let migration = &self.migration;
        DdlOptions {
            quote: Quoter::new(migration.quote.clone()),
            separator: migration.command_separator.clone(),
            charmax: migration.charmax,
            add_drop: migration.add_drop,
            skip_unsupported: migration.skip_unsupported,
            index_separator: migration
                .index_separator
                .clone()
                .unwrap_or_else(|| self.target.dialect.index_separator().to_string()),
        }
    }

    /// Built-in templates, or the override file layered over them.
    pub fn template_source(&self) -> Result<Box<dyn TemplateSource>> {
        match &self.templates {
            Some(path) => Ok(Box::new(FileTemplates::load(path)?)),
            None => Ok(Box::new(BuiltinTemplates)),
        }
    }
}

impl EndpointConfig {
    /// Parse `dialect://host[:port][/database[?user[&password]]]`.
    pub fn from_url(url: &str) -> Result<Self> {
        let invalid = |why: &str| MigrateError::Config(format!("invalid connection '{}': {}", url, why));

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid("expected dialect://host"))?;
        let dialect: Dialect = scheme.parse()?;

        let (address, path) = match rest.split_once('/') {
            Some((address, path)) => (address, Some(path)),
            None => (rest, None),
        };
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>().map_err(|_| invalid("port is not a number"))?,
            ),
            None => (address, 0),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let (database, credentials) = match path {
            Some(path) => match path.split_once('?') {
                Some((db, creds)) => (db, Some(creds)),
                None => (path, None),
            },
            None => ("", None),
        };
        let (user, password) = match credentials {
            Some(creds) => match creds.split_once('&') {
                Some((user, password)) => (user, password),
                None => (creds, ""),
            },
            None => ("", ""),
        };

        Ok(Self {
            dialect,
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            schema: None,
        }
        .with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source:
  dialect: mssql
  host: sql1
  user: sa
  password: secret
  schema: dbo
target:
  dialect: postgres
  host: pg1
  database: warehouse
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.port, 1433);
        assert_eq!(config.source.database, "master");
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.database, "warehouse");
        assert_eq!(config.migration.batch_size, 500);
        assert_eq!(config.migration.max_rows, 100_000);
        assert_eq!(config.migration.command_separator, ";");
        assert_eq!(config.output.prefix, "dbmv");
    }

    #[test]
    fn test_debug_and_display_hide_password() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert_eq!(config.source.to_string(), "mssql://sa@sql1:1433/master");
        assert_eq!(config.redacted().source.password, "********");

        let yaml = config.to_redacted_yaml().unwrap();
        assert!(yaml.contains("host: sql1"));
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_load_method_overrides_threads() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.migration.threads = 7;
        assert_eq!(config.migration.effective_threads(), 7);
        config.migration.load_method = Some(LoadMethod::Parallel);
        assert_eq!(config.migration.effective_threads(), 4);
        config.migration.load_method = Some(LoadMethod::Multitable);
        let threads = config.migration.effective_threads();
        assert!((1..=MAX_THREADS).contains(&threads));
    }

    #[test]
    fn test_ddl_options_use_target_separator() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.ddl_options().index_separator, "_ax11_");
        config.target.dialect = Dialect::Vector;
        assert_eq!(config.ddl_options().index_separator, "_x100_");
        config.migration.index_separator = Some("__".to_string());
        assert_eq!(config.ddl_options().index_separator, "__");
    }

    #[test]
    fn test_schema_mapper_from_translation() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.migration.translation = Some("scname:dbo,demo".to_string());
        let mapper = config.schema_mapper().unwrap();
        assert_eq!(mapper.target_schema("dbo"), "demo");
        assert_eq!(mapper.target_schema("sales"), "sales");
    }

    #[test]
    fn test_endpoint_from_full_url() {
        let ep = EndpointConfig::from_url("postgres://db.local:6543/sales?loader&pw").unwrap();
        assert_eq!(ep.dialect, Dialect::Postgres);
        assert_eq!(ep.host, "db.local");
        assert_eq!(ep.port, 6543);
        assert_eq!(ep.database, "sales");
        assert_eq!(ep.user, "loader");
        assert_eq!(ep.password, "pw");
    }

    #[test]
    fn test_endpoint_from_short_url_uses_defaults() {
        let ep = EndpointConfig::from_url("vector://vw1").unwrap();
        assert_eq!(ep.port, 27832);
        assert_eq!(ep.database, "iidbdb");
        assert!(ep.user.is_empty());

        let ep = EndpointConfig::from_url("mssql://sql1/app?sa").unwrap();
        assert_eq!(ep.port, 1433);
        assert_eq!(ep.database, "app");
        assert_eq!(ep.user, "sa");
        assert!(ep.password.is_empty());
    }

    #[test]
    fn test_endpoint_url_errors() {
        assert!(EndpointConfig::from_url("sql1:1433").is_err());
        assert!(EndpointConfig::from_url("oracle://h").is_err());
        assert!(EndpointConfig::from_url("mssql://h:port").is_err());
        assert!(EndpointConfig::from_url("mssql://").is_err());
    }
}
