//! Configuration validation.

use super::{Config, EndpointConfig, MAX_THREADS};
use crate::dialect::PairProfile;
use crate::error::{MigrateError, Result};

/// Validate the configuration. Runs before any connection is opened.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint("source", &config.source)?;
    validate_endpoint("target", &config.target)?;

    PairProfile::select(config.source.dialect, config.target.dialect)?;

    let migration = &config.migration;
    if !(1..=10_000).contains(&migration.batch_size) {
        return Err(MigrateError::Config(format!(
            "migration.batch_size must be between 1 and 10000, got {}",
            migration.batch_size
        )));
    }
    if !(1..=1_000_000).contains(&migration.max_rows) {
        return Err(MigrateError::Config(format!(
            "migration.max_rows must be between 1 and 1000000, got {}",
            migration.max_rows
        )));
    }
    if !(1..=MAX_THREADS).contains(&migration.threads) {
        return Err(MigrateError::Config(format!(
            "migration.threads must be between 1 and {}, got {}",
            MAX_THREADS, migration.threads
        )));
    }
    if migration.charmax < 1 {
        return Err(MigrateError::Config(
            "migration.charmax must be at least 1".into(),
        ));
    }
    if !matches!(migration.insert_mode.to_uppercase().as_str(), "BULK" | "ROW") {
        return Err(MigrateError::Config(format!(
            "migration.insert_mode must be BULK or ROW, got '{}'",
            migration.insert_mode
        )));
    }
    if migration.command_separator.is_empty() {
        return Err(MigrateError::Config(
            "migration.command_separator must not be empty".into(),
        ));
    }
    if migration.field_delimiter.is_empty() {
        return Err(MigrateError::Config(
            "migration.field_delimiter must not be empty".into(),
        ));
    }

    config.table_filter()?;
    config.schema_mapper()?;

    Ok(())
}

fn validate_endpoint(name: &str, endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.host.trim().is_empty() {
        return Err(MigrateError::Config(format!("{}.host is required", name)));
    }
    Ok(())
}
