//! Datasource adapters
//!
//! Each adapter runs a query against an external store and converts the
//! result into rows of script values.

pub mod decode;
pub mod postgres;
pub mod prometheus;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::script::ScriptValue;

pub use postgres::PostgresDatasource;
pub use prometheus::PrometheusDatasource;

/// One result row: column name to value
pub type Row = BTreeMap<String, ScriptValue>;

#[async_trait]
pub trait Datasource: Send + Sync {
    /// Adapter kind, e.g. `postgres`
    fn kind(&self) -> &'static str;

    /// Configured name, unique within the kind
    fn name(&self) -> &str;

    /// Deadline applied to every query
    fn timeout(&self) -> Duration;

    /// Run a query without a deadline; use [`execute`] from call sites
    async fn query(&self, query: &str) -> Result<Vec<Row>, DatasourceError>;
}

/// Run `query` on `datasource`, giving up after `timeout`
///
/// On elapse the in-flight query future is dropped, which cancels it.
pub async fn execute(
    datasource: &dyn Datasource,
    query: &str,
    timeout: Duration,
) -> Result<Vec<Row>, DatasourceError> {
    match tokio::time::timeout(timeout, datasource.query(query)).await {
        Ok(result) => result,
        Err(_) => Err(DatasourceError::Timeout(timeout)),
    }
}

/// Datasource errors
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("decode error: {0}")]
    Decode(String),
}
