use super::{Connector, RowStream};
use crate::config::EndpointConfig;
use crate::core::{Row, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_postgres::{Client, Config as PgConfig, NoTls, SimpleQueryMessage};
use tracing::{debug, error};

const CURSOR: &str = "dbmv_cursor";
const FETCH_SIZE: usize = 1000;

/// PostgreSQL session over the simple-query protocol.
///
/// Queries run through a server-side cursor so large tables are fetched
/// [`FETCH_SIZE`] rows at a time. Every value arrives as text.
pub struct PostgresConnector {
    client: Client,
    cursor_open: Arc<AtomicBool>,
}

impl PostgresConnector {
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&endpoint.host);
        pg_config.port(endpoint.port);
        pg_config.dbname(&endpoint.database);
        pg_config.user(&endpoint.user);
        pg_config.password(&endpoint.password);
        pg_config.application_name("dbmv");
        pg_config.keepalives(true);

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| MigrateError::connection(e.to_string(), endpoint.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        debug!("Connected to {}", endpoint);
        Ok(Self {
            client,
            cursor_open: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Abandon a cursor whose stream was dropped before exhaustion.
    async fn reset_cursor(&mut self) -> Result<()> {
        if self.cursor_open.swap(false, Ordering::SeqCst) {
            debug!("Discarding unfinished cursor");
            self.client.simple_query("ROLLBACK").await?;
        }
        Ok(())
    }
}

struct Fetch<'a> {
    client: &'a Client,
    cursor_open: Arc<AtomicBool>,
    buffered: VecDeque<Row>,
    done: bool,
}

impl Fetch<'_> {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.buffered.is_empty() && !self.done {
            let fetch = format!("FETCH FORWARD {} FROM {}", FETCH_SIZE, CURSOR);
            let messages = self.client.simple_query(&fetch).await?;
            self.buffered.extend(messages.iter().filter_map(|m| match m {
                SimpleQueryMessage::Row(row) => Some(
                    (0..row.len())
                        .map(|i| row.get(i).map(SqlValue::from).unwrap_or(SqlValue::Null))
                        .collect(),
                ),
                _ => None,
            }));
            if self.buffered.len() < FETCH_SIZE {
                self.done = true;
                self.client
                    .simple_query(&format!("CLOSE {}; COMMIT", CURSOR))
                    .await?;
                self.cursor_open.store(false, Ordering::SeqCst);
            }
        }
        Ok(self.buffered.pop_front())
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        self.reset_cursor().await?;
        let declare = format!("BEGIN; DECLARE {} NO SCROLL CURSOR FOR {}", CURSOR, sql);
        if let Err(e) = self.client.simple_query(&declare).await {
            self.client.simple_query("ROLLBACK").await.ok();
            return Err(MigrateError::statement(sql, e));
        }
        self.cursor_open.store(true, Ordering::SeqCst);

        let fetch = Fetch {
            client: &self.client,
            cursor_open: Arc::clone(&self.cursor_open),
            buffered: VecDeque::new(),
            done: false,
        };
        Ok(Box::pin(stream::try_unfold(fetch, |mut fetch| async move {
            Ok(fetch.next_row().await?.map(|row| (row, fetch)))
        })))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.reset_cursor().await?;
        self.client
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::statement(sql, e))?;
        Ok(())
    }

    /// Statements run in autocommit mode; nothing is pending.
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.reset_cursor().await
    }
}
