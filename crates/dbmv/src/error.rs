//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, out-of-range values, include/exclude conflicts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Opening a connection failed
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// A source type has no entry in the active type mapping
    #[error("Unsupported type {type_name} ({context})")]
    UnsupportedType { type_name: String, context: String },

    /// Malformed template or unknown placeholder
    #[error("Template error: {0}")]
    Template(String),

    /// A DDL or DML statement failed against the destination
    #[error("Statement failed: {message}\n  Statement: {statement}")]
    Statement { statement: String, message: String },

    /// Data copy failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create an UnsupportedType error
    pub fn unsupported_type(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::UnsupportedType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    /// Create a Statement error, keeping the failing statement for the log
    pub fn statement(statement: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Statement {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => 1,
            MigrateError::Connection { .. } | MigrateError::Mssql(_) | MigrateError::Postgres(_) => 2,
            MigrateError::UnsupportedType { .. } => 3,
            MigrateError::Statement { .. } | MigrateError::Transfer { .. } => 4,
            MigrateError::Template(_) => 5,
            MigrateError::Cancelled => 6,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_class() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::connection("refused", "worker 2").exit_code(), 2);
        assert_eq!(MigrateError::unsupported_type("XML", "a.b").exit_code(), 3);
        assert_eq!(MigrateError::statement("INSERT", "boom").exit_code(), 4);
        assert_eq!(MigrateError::Cancelled.exit_code(), 6);
    }

    #[test]
    fn test_statement_error_keeps_sql() {
        let err = MigrateError::statement("DROP TABLE t", "permission denied");
        let text = err.to_string();
        assert!(text.contains("permission denied"));
        assert!(text.contains("DROP TABLE t"));
    }

    #[test]
    fn test_format_detailed_walks_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.yaml");
        let err = MigrateError::from(io);
        assert!(err.format_detailed().starts_with("Error: IO error"));
    }
}
