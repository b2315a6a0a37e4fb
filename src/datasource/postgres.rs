//! Postgres datasource

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use super::decode::decoder_for;
use super::{Datasource, DatasourceError, Row};
use crate::config::PostgresConfig;
use crate::script::ScriptValue;

/// Postgres adapter over a lazily connected pool
///
/// Queries use the simple query protocol, so every column arrives as text
/// and is decoded by the converter registered for its column type.
pub struct PostgresDatasource {
    name: String,
    pool: PgPool,
    timeout: Duration,
}

impl PostgresDatasource {
    pub fn new(config: &PostgresConfig) -> Result<Self, DatasourceError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .database(&config.database)
            .application_name("lookout");

        if let Some(password) = &config.password {
            options = options.password(password);
        }

        if let Some(mode) = &config.ssl_mode {
            options = options.ssl_mode(mode.parse::<PgSslMode>()?);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.timeout)
            .connect_lazy_with(options);

        Ok(Self {
            name: config.name.clone(),
            pool,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl Datasource for PostgresDatasource {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn query(&self, query: &str) -> Result<Vec<Row>, DatasourceError> {
        tracing::debug!(datasource = %self.name, query = %query, "Postgres query");

        let rows = sqlx::raw_sql(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(
                    datasource = %self.name,
                    query = %query,
                    error = %e,
                    "Postgres query failed"
                );
                DatasourceError::Database(e)
            })?;

        Ok(rows.iter().map(decode_row).collect())
    }
}

fn decode_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let text = match row.try_get_raw(column.ordinal()) {
                Ok(raw) if raw.is_null() => None,
                Ok(raw) => raw.as_str().ok(),
                Err(_) => None,
            };
            let value = decode_column(column.type_info().name(), text);
            (column.name().to_string(), value)
        })
        .collect()
}

/// `None` covers both SQL NULL and bytes that are not valid UTF-8
fn decode_column(type_name: &str, text: Option<&str>) -> ScriptValue {
    match text {
        Some(text) => decoder_for(type_name)(text),
        None => ScriptValue::Nil,
    }
}
