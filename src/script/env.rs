//! Host-function contract between the engine and the script runtime

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;

use super::value::ScriptValue;

/// A host function callable from scripts: argument list in, return list out
///
/// Host functions never fail from the runtime's point of view; faults are
/// reported through return values.
pub type HostFunction = Arc<dyn Fn(Vec<ScriptValue>) -> BoxFuture<'static, Vec<ScriptValue>> + Send + Sync>;

/// Wrap an async closure as a [`HostFunction`]
pub fn host_fn<F, Fut>(f: F) -> HostFunction
where
    F: Fn(Vec<ScriptValue>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Vec<ScriptValue>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// The script being executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    /// Channels used when a report does not address any
    pub channels: Vec<String>,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }
}

/// Named set of host functions exposed under one namespace
#[derive(Clone, Default)]
pub struct Module {
    functions: BTreeMap<String, HostFunction>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: impl Into<String>, function: HostFunction) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn function(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("functions", &self.function_names())
            .finish()
    }
}

/// Builds a module for one script execution
pub trait ModuleLoader: Send + Sync {
    /// Namespace the module is registered under
    fn name(&self) -> String;

    fn load(&self, script: &Script) -> Module;
}

/// Environment of one script execution
///
/// All modules are registered before any user code runs; the runtime then
/// resolves `module.function(...)` calls through [`call`](Self::call).
#[derive(Debug, Default)]
pub struct ScriptEnv {
    script: Script,
    modules: HashMap<String, Module>,
}

impl ScriptEnv {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            modules: HashMap::new(),
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn register(&mut self, loader: &dyn ModuleLoader) {
        let name = loader.name();
        let module = loader.load(&self.script);
        tracing::trace!(
            script = %self.script.name,
            module = %name,
            functions = ?module.function_names(),
            "Registered script module"
        );
        self.modules.insert(name, module);
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn call(
        &self,
        module: &str,
        function: &str,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let m = self
            .modules
            .get(module)
            .ok_or_else(|| ScriptError::UnknownModule(module.to_string()))?;

        let f = m
            .function(function)
            .ok_or_else(|| ScriptError::UnknownFunction {
                module: module.to_string(),
                function: function.to_string(),
            })?;

        Ok(f(args).await)
    }
}

/// Lookup failures raised by the runtime itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("module '{0}' not found")]
    UnknownModule(String),

    #[error("function '{function}' not found in module '{module}'")]
    UnknownFunction { module: String, function: String },
}

/// Argument helpers shared by the bridge modules
pub(crate) mod args {
    use super::ScriptValue;

    pub fn string(args: &[ScriptValue], idx: usize) -> Option<String> {
        args.get(idx).and_then(|v| match v {
            ScriptValue::String(s) => Some(s.clone()),
            ScriptValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// A single name or a sequence of names
    pub fn string_list(value: &ScriptValue) -> Result<Vec<String>, String> {
        match value {
            ScriptValue::Nil => Ok(Vec::new()),
            ScriptValue::String(s) => Ok(vec![s.clone()]),
            ScriptValue::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| format!("expected string, got {}", item.type_name()))
                })
                .collect(),
            other => Err(format!("expected string or sequence, got {}", other.type_name())),
        }
    }
}
