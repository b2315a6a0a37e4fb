//! Datasource script modules (`<kind>.<name>`)

use std::sync::Arc;

use super::env::{host_fn, Module, ModuleLoader, Script};
use super::value::ScriptValue;
use crate::datasource::{execute, Datasource, Row};

/// Exposes one datasource's `query` verb to scripts
#[derive(Clone)]
pub struct DatasourceModule {
    datasource: Arc<dyn Datasource>,
}

impl DatasourceModule {
    pub fn new(datasource: Arc<dyn Datasource>) -> Self {
        Self { datasource }
    }

    /// Run a script query; returns `(rows, nil)` or `(nil, error)`
    pub async fn query(&self, args: Vec<ScriptValue>) -> Vec<ScriptValue> {
        let query = match args.first() {
            Some(ScriptValue::String(q)) if !q.trim().is_empty() => q.clone(),
            _ => {
                return vec![
                    ScriptValue::Nil,
                    ScriptValue::from("query must be a non-empty string"),
                ]
            }
        };

        let ds = self.datasource.as_ref();
        match execute(ds, &query, ds.timeout()).await {
            Ok(rows) => vec![rows_value(rows), ScriptValue::Nil],
            Err(e) => {
                tracing::error!(
                    datasource = %ds.name(),
                    kind = ds.kind(),
                    query = %query,
                    error = %e,
                    "Datasource query failed"
                );
                vec![ScriptValue::Nil, ScriptValue::from(e.to_string())]
            }
        }
    }
}

impl ModuleLoader for DatasourceModule {
    fn name(&self) -> String {
        format!("{}.{}", self.datasource.kind(), self.datasource.name())
    }

    fn load(&self, _script: &Script) -> Module {
        let module = self.clone();
        Module::new().with_function(
            "query",
            host_fn(move |args| {
                let module = module.clone();
                async move { module.query(args).await }
            }),
        )
    }
}

fn rows_value(rows: Vec<Row>) -> ScriptValue {
    ScriptValue::Sequence(rows.into_iter().map(ScriptValue::Map).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::StaticDatasource;
    use crate::script::ScriptEnv;
    use std::time::{Duration, Instant};

    fn env(ds: StaticDatasource) -> ScriptEnv {
        let mut env = ScriptEnv::new(Script::new("s"));
        env.register(&DatasourceModule::new(Arc::new(ds)));
        env
    }

    #[tokio::test]
    async fn test_query_returns_rows() {
        let mut row = Row::new();
        row.insert("host".into(), ScriptValue::from("db1"));
        row.insert("note".into(), ScriptValue::Nil);
        row.insert("label".into(), ScriptValue::from(""));

        let env = env(StaticDatasource::new("main", vec![row]));
        let ret = env
            .call("static.main", "query", vec![ScriptValue::from("SELECT 1")])
            .await
            .unwrap();

        assert_eq!(ret.len(), 2);
        assert_eq!(ret[1], ScriptValue::Nil);
        let rows = ret[0].as_sequence().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("host"), Some(&ScriptValue::from("db1")));
        assert_eq!(rows[0].get("note"), Some(&ScriptValue::Nil));
        assert_eq!(rows[0].get("label"), Some(&ScriptValue::from("")));
    }

    #[tokio::test]
    async fn test_query_failure_is_dual_return() {
        let mut ds = StaticDatasource::new("main", vec![]);
        ds.fail_with = Some("relation \"x\" does not exist".to_string());

        let ret = env(ds)
            .call("static.main", "query", vec![ScriptValue::from("SELECT * FROM x")])
            .await
            .unwrap();

        assert_eq!(ret[0], ScriptValue::Nil);
        assert!(ret[1].as_str().unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_query_timeout_is_dual_return() {
        let mut ds = StaticDatasource::new("main", vec![]);
        ds.delay = Duration::from_secs(30);
        ds.timeout = Duration::from_millis(100);

        let started = Instant::now();
        let ret = env(ds)
            .call("static.main", "query", vec![ScriptValue::from("SELECT 1")])
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(ret[0], ScriptValue::Nil);
        assert!(ret[1].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_query_argument() {
        let ret = env(StaticDatasource::new("main", vec![]))
            .call("static.main", "query", vec![])
            .await
            .unwrap();

        assert_eq!(ret[0], ScriptValue::Nil);
        assert!(ret[1].as_str().is_some());
    }
}
