//! Database connections as seen by the migrator.
//!
//! A [`Connector`] is one session: it can stream a query's rows, execute a
//! statement and commit. Both the catalog reader and the loader go through
//! this trait, so they are tested against [`MemoryConnector`] without a
//! server.

mod memory;
mod mssql;
mod postgres;

pub use memory::{MemoryConnector, MemoryLog};
pub use mssql::MssqlConnector;
pub use postgres::PostgresConnector;

use crate::config::EndpointConfig;
use crate::core::{MetadataRow, Row};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;

/// Rows of one query, pulled on demand.
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// One open database session.
#[async_trait]
pub trait Connector: Send {
    fn dialect(&self) -> Dialect;

    /// Start a query. Rows are fetched lazily as the stream is polled; the
    /// connection is busy until the stream is dropped.
    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>>;

    /// Run a statement that returns no rows.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Run a catalog query and collect it into metadata rows.
    async fn fetch_metadata(&mut self, sql: &str) -> Result<Vec<MetadataRow>> {
        let rows: Vec<Row> = self.query(sql).await?.try_collect().await?;
        Ok(rows.into_iter().map(MetadataRow::new).collect())
    }
}

/// Opens new sessions, one per worker slot.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn Connector>>;
}

/// Opens a real driver connection for the endpoint's dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverFactory;

#[async_trait]
impl ConnectorFactory for DriverFactory {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn Connector>> {
        match endpoint.dialect {
            Dialect::Postgres => Ok(Box::new(PostgresConnector::connect(endpoint).await?)),
            Dialect::Mssql => Ok(Box::new(MssqlConnector::connect(endpoint).await?)),
            other => Err(MigrateError::connection(
                format!("no live driver for {}", other),
                endpoint.to_string(),
            )),
        }
    }
}
