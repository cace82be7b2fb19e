use super::{Connector, RowStream};
use crate::config::EndpointConfig;
use crate::core::{Row, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// SQL Server session over TDS.
///
/// Rows stream straight off the wire; values keep their native types.
pub struct MssqlConnector {
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnector {
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self> {
        let mut config = Config::new();
        config.host(&endpoint.host);
        config.port(endpoint.port);
        config.database(&endpoint.database);
        config.authentication(AuthMethod::sql_server(&endpoint.user, &endpoint.password));
        config.trust_cert();
        config.encryption(EncryptionLevel::NotSupported);

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MigrateError::connection(e.to_string(), endpoint.to_string()))?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| MigrateError::connection(e.to_string(), endpoint.to_string()))?;

        debug!("Connected to {}", endpoint);
        Ok(Self { client })
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        let stream = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::statement(sql, e))?;
        Ok(Box::pin(
            stream
                .into_row_stream()
                .map_err(MigrateError::from)
                .and_then(|row| async move { convert_row(row) }),
        ))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.client
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::statement(sql, e))?
            .into_results()
            .await
            .map_err(|e| MigrateError::statement(sql, e))?;
        Ok(())
    }

    /// Statements run in autocommit mode; nothing is pending.
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn convert_row(row: tiberius::Row) -> Result<Row> {
    row.into_iter().map(|data| convert_value(&data)).collect()
}

fn value<T>(v: Option<T>, wrap: impl FnOnce(T) -> SqlValue) -> SqlValue {
    v.map(wrap).unwrap_or(SqlValue::Null)
}

/// Map one TDS value onto [`SqlValue`].
fn convert_value(data: &ColumnData<'static>) -> Result<SqlValue> {
    let converted = match data {
        ColumnData::U8(v) => value(*v, |v| SqlValue::I16(v as i16)),
        ColumnData::I16(v) => value(*v, SqlValue::I16),
        ColumnData::I32(v) => value(*v, SqlValue::I32),
        ColumnData::I64(v) => value(*v, SqlValue::I64),
        ColumnData::F32(v) => value(*v, SqlValue::F32),
        ColumnData::F64(v) => value(*v, SqlValue::F64),
        ColumnData::Bit(v) => value(*v, SqlValue::Bool),
        ColumnData::String(v) => value(v.as_ref(), |s| SqlValue::Text(s.to_string())),
        ColumnData::Guid(v) => value(*v, SqlValue::Uuid),
        ColumnData::Binary(v) => value(v.as_ref(), |b| SqlValue::Bytes(b.to_vec())),
        ColumnData::Xml(v) => value(v.as_ref(), |x| {
            SqlValue::Text(x.clone().into_owned().into_string())
        }),
        ColumnData::Numeric(_) => value(Decimal::from_sql(data)?, SqlValue::Decimal),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            value(NaiveDateTime::from_sql(data)?, SqlValue::DateTime)
        }
        ColumnData::Date(_) => value(NaiveDate::from_sql(data)?, SqlValue::Date),
        ColumnData::Time(_) => value(NaiveTime::from_sql(data)?, SqlValue::Time),
        ColumnData::DateTimeOffset(_) => {
            value(DateTime::<FixedOffset>::from_sql(data)?, SqlValue::DateTimeOffset)
        }
    };
    Ok(converted)
}
