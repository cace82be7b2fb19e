use super::{Connector, ConnectorFactory, RowStream};
use crate::config::EndpointConfig;
use crate::core::Row;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use futures::stream;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LogState {
    queries: Vec<String>,
    statements: Vec<String>,
    commits: usize,
    closes: usize,
    connects: usize,
}

/// Shared record of everything the in-memory connectors were asked to do.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<LogState>>,
}

impl MemoryLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    /// Executed statements, in execution order across all connectors.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Executed statements starting with `prefix`.
    pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|s| s.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Connections opened through a [`MemoryConnector`] factory.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }
}

/// Scripted in-process connector.
///
/// Queries return the rows registered for the first pattern they contain,
/// or nothing. Any query or statement containing a failure marker errors.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    dialect: Dialect,
    results: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    refuse_connect: bool,
    log: MemoryLog,
}

impl MemoryConnector {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            results: Vec::new(),
            failures: Vec::new(),
            refuse_connect: false,
            log: MemoryLog::default(),
        }
    }

    pub fn with_result(mut self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.results.push((pattern.into(), rows));
        self
    }

    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.failures.push(marker.into());
        self
    }

    /// Used as a factory, refuse to open new connections.
    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn log(&self) -> MemoryLog {
        self.log.clone()
    }

    fn check(&self, sql: &str) -> Result<()> {
        match self.failures.iter().find(|m| sql.contains(m.as_str())) {
            Some(marker) => Err(MigrateError::statement(
                sql,
                format!("injected failure on '{}'", marker),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        self.log.lock().queries.push(sql.to_string());
        self.check(sql)?;
        let rows = self
            .results
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.check(sql)?;
        self.log.lock().statements.push(sql.to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.log.lock().commits += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

/// A connector doubles as the factory for more connectors like itself,
/// sharing its script and log.
#[async_trait]
impl ConnectorFactory for MemoryConnector {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Box<dyn Connector>> {
        if self.refuse_connect {
            return Err(MigrateError::connection(
                "connection refused",
                endpoint.to_string(),
            ));
        }
        self.log.lock().connects += 1;
        let mut conn = self.clone();
        conn.dialect = endpoint.dialect;
        Ok(Box::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlValue;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_scripted_query_and_log() {
        let mut conn = MemoryConnector::new(Dialect::Postgres)
            .with_result("FROM t", vec![vec![SqlValue::I32(1)], vec![SqlValue::I32(2)]]);
        let rows: Vec<Row> = conn
            .query("SELECT a FROM t")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        conn.execute("INSERT INTO t VALUES (3)").await.unwrap();
        conn.commit().await.unwrap();
        let log = conn.log();
        assert_eq!(log.queries(), vec!["SELECT a FROM t"]);
        assert_eq!(log.statements(), vec!["INSERT INTO t VALUES (3)"]);
        assert_eq!(log.commits(), 1);
    }

    #[tokio::test]
    async fn test_failure_marker() {
        let mut conn = MemoryConnector::new(Dialect::Postgres).failing_on("BAD");
        assert!(conn.execute("INSERT BAD").await.is_err());
        assert!(conn.query("SELECT BAD").await.is_err());
        assert!(conn.log().statements().is_empty());
    }
}
