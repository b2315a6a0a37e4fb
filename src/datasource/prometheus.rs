//! Prometheus datasource (HTTP API instant queries)

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Datasource, DatasourceError, Row};
use crate::config::{BasicAuth, PrometheusConfig};
use crate::script::ScriptValue;

pub struct PrometheusDatasource {
    name: String,
    url: String,
    basic_auth: Option<BasicAuth>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    value: Option<(f64, String)>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl PrometheusDatasource {
    pub fn new(config: &PrometheusConfig) -> Result<Self, DatasourceError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            basic_auth: config.basic_auth.clone(),
            timeout: config.timeout,
            client,
        })
    }

    fn rows(data: QueryData) -> Result<Vec<Row>, DatasourceError> {
        match data.result_type.as_str() {
            "vector" | "matrix" => {
                let series: Vec<Series> = serde_json::from_value(data.result)
                    .map_err(|e| DatasourceError::Decode(e.to_string()))?;
                Ok(series.into_iter().map(series_row).collect())
            }
            "scalar" | "string" => {
                let (ts, raw): (f64, String) = serde_json::from_value(data.result)
                    .map_err(|e| DatasourceError::Decode(e.to_string()))?;
                let value = if data.result_type == "scalar" {
                    sample_value(&raw)
                } else {
                    ScriptValue::String(raw)
                };

                let mut row = Row::new();
                row.insert("timestamp".into(), ScriptValue::Number(ts));
                row.insert("value".into(), value);
                Ok(vec![row])
            }
            other => Err(DatasourceError::Decode(format!(
                "unsupported result type {}",
                other
            ))),
        }
    }
}

fn sample_value(raw: &str) -> ScriptValue {
    raw.parse::<f64>()
        .map(ScriptValue::Number)
        .unwrap_or(ScriptValue::Nil)
}

fn sample(ts: f64, raw: &str) -> ScriptValue {
    let mut map = BTreeMap::new();
    map.insert("timestamp".to_string(), ScriptValue::Number(ts));
    map.insert("value".to_string(), sample_value(raw));
    ScriptValue::Map(map)
}

fn series_row(series: Series) -> Row {
    let mut row = Row::new();
    row.insert(
        "metric".into(),
        ScriptValue::Map(
            series
                .metric
                .into_iter()
                .map(|(k, v)| (k, ScriptValue::String(v)))
                .collect(),
        ),
    );

    if let Some((ts, raw)) = series.value {
        row.insert("timestamp".into(), ScriptValue::Number(ts));
        row.insert("value".into(), sample_value(&raw));
    }

    if !series.values.is_empty() {
        row.insert(
            "values".into(),
            ScriptValue::Sequence(series.values.iter().map(|(ts, raw)| sample(*ts, raw)).collect()),
        );
    }

    row
}

#[async_trait]
impl Datasource for PrometheusDatasource {
    fn kind(&self) -> &'static str {
        "prometheus"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn query(&self, query: &str) -> Result<Vec<Row>, DatasourceError> {
        tracing::debug!(datasource = %self.name, query = %query, "Prometheus query");

        let mut request = self
            .client
            .get(format!("{}/api/v1/query", self.url))
            .query(&[("query", query)]);

        if let Some(auth) = &self.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(DatasourceError::Remote(format!("status {}", status)))
            }
            Err(e) => return Err(DatasourceError::Decode(e.to_string())),
        };

        if parsed.status != "success" {
            return Err(DatasourceError::Remote(format!(
                "{}: {}",
                parsed.error_type.unwrap_or_else(|| "error".to_string()),
                parsed.error.unwrap_or_default()
            )));
        }

        let data = parsed
            .data
            .ok_or_else(|| DatasourceError::Decode("response has no data".to_string()))?;
        Self::rows(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn datasource(url: String, basic_auth: Option<BasicAuth>) -> PrometheusDatasource {
        PrometheusDatasource::new(&PrometheusConfig {
            name: "prom".to_string(),
            url,
            basic_auth,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_vector_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", "up"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "vector",
                    "result": [
                        {"metric": {"job": "api"}, "value": [1700000000.5, "1"]},
                        {"metric": {"job": "db"}, "value": [1700000000.5, "NaN"]}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let rows = datasource(server.uri(), None).query("up").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], ScriptValue::Number(1.0));
        assert_eq!(rows[0]["timestamp"], ScriptValue::Number(1700000000.5));
        assert_eq!(
            rows[0]["metric"].get("job"),
            Some(&ScriptValue::from("api"))
        );
        assert!(rows[1]["value"].as_f64().unwrap().is_nan());
    }

    #[tokio::test]
    async fn test_matrix_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [
                        {"metric": {}, "values": [[1, "2"], [2, "3"]]}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let rows = datasource(server.uri(), None)
            .query("rate(x[5m])")
            .await
            .unwrap();
        let values = rows[0]["values"].as_sequence().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].get("value"), Some(&ScriptValue::Number(3.0)));
    }

    #[tokio::test]
    async fn test_scalar_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "scalar", "result": [1, "42"]}
            })))
            .mount(&server)
            .await;

        let rows = datasource(server.uri(), None).query("42").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["value"], ScriptValue::Number(42.0));
    }

    #[tokio::test]
    async fn test_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "parse error"
            })))
            .mount(&server)
            .await;

        let err = datasource(server.uri(), None).query("up{").await.unwrap_err();
        assert_eq!(err.to_string(), "remote error: bad_data: parse error");
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let server = MockServer::start().await;
        // base64("user:pass")
        Mock::given(method("GET"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "vector", "result": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = BasicAuth {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        let rows = datasource(server.uri(), Some(auth)).query("up").await.unwrap();
        assert!(rows.is_empty());
    }
}
