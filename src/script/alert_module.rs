//! `alert` script module: severity reports and alert lookups

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::SecondsFormat;

use super::env::{args, host_fn, HostFunction, Module, ModuleLoader, Script};
use super::value::ScriptValue;
use crate::alert::{Alert, AlertRegistry, Level};
use crate::notify::{Dispatcher, MessageOptions};

/// Verb names and the level each one reports
pub const REPORT_VERBS: [(&str, Level); 8] = [
    ("warn", Level::Warning),
    ("warning", Level::Warning),
    ("error", Level::Error),
    ("on", Level::Error),
    ("fail", Level::Error),
    ("success", Level::Success),
    ("off", Level::Success),
    ("ok", Level::Success),
];

/// Routes script reports into the registry and, on a level change, the dispatcher
#[derive(Clone)]
pub struct AlertModule {
    registry: Arc<AlertRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl AlertModule {
    pub fn new(registry: Arc<AlertRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Handle one report verb call
    ///
    /// Returns nothing on success, or a single error string. A notification
    /// goes out only when the level changed (unless `quiet`), or on every
    /// `repeat`-th consecutive report of the same level.
    pub async fn report(&self, script: &Script, level: Level, args: Vec<ScriptValue>) -> Vec<ScriptValue> {
        let call = match ReportCall::parse(args) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(script = %script.name, error = %e, "Wrong alert call parameters");
                return vec![ScriptValue::from(format!("wrong parameters: {}", e))];
            }
        };

        let outcome = match self.registry.report(&call.name, level) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    script = %script.name,
                    alert = %call.name,
                    error = %e,
                    "Failed to update alert"
                );
                return vec![ScriptValue::from(e.to_string())];
            }
        };

        let notify = if outcome.changed {
            !call.options.quiet
        } else {
            call.options.repeat > 0 && outcome.alert.count() % call.options.repeat == 0
        };

        if notify {
            let channels = call
                .channels
                .or(call.options.channels)
                .unwrap_or_else(|| script.channels.clone());

            self.dispatcher
                .dispatch(level, &call.name, &call.text, &channels, &call.options.message)
                .await;
        }

        Vec::new()
    }

    /// Handle `get`: all alerts, one alert by name, or alerts at a level
    pub fn get(&self, args: &[ScriptValue]) -> Vec<ScriptValue> {
        let selected = match args.first() {
            None | Some(ScriptValue::Nil) => self.select(None),
            Some(ScriptValue::String(name)) => {
                let value = self
                    .registry
                    .get(name)
                    .map(|alert| alert_value(&alert))
                    .unwrap_or_default();
                Ok(value)
            }
            Some(ScriptValue::Map(filter)) => match filter.get("level") {
                None | Some(ScriptValue::Nil) => self.select(None),
                Some(ScriptValue::String(level)) => match level.parse::<Level>() {
                    Ok(level) => self.select(Some(level)),
                    Err(_) => Err("bad level value".to_string()),
                },
                Some(_) => Err("bad level value".to_string()),
            },
            Some(other) => Err(format!(
                "wrong parameters: expected name or filter, got {}",
                other.type_name()
            )),
        };

        match selected {
            Ok(value) => vec![value, ScriptValue::Nil],
            Err(e) => vec![ScriptValue::Nil, ScriptValue::from(e)],
        }
    }

    fn select(&self, level: Option<Level>) -> Result<ScriptValue, String> {
        let alerts = self.registry.all().map_err(|e| e.to_string())?;
        Ok(ScriptValue::Sequence(
            alerts
                .iter()
                .filter(|a| level.map_or(true, |l| a.has_level(l)))
                .map(alert_value)
                .collect(),
        ))
    }

    fn report_fn(&self, script: &Arc<Script>, level: Level) -> HostFunction {
        let module = self.clone();
        let script = Arc::clone(script);
        host_fn(move |args| {
            let module = module.clone();
            let script = Arc::clone(&script);
            async move { module.report(&script, level, args).await }
        })
    }

    fn get_fn(&self) -> HostFunction {
        let module = self.clone();
        host_fn(move |args| {
            let result = module.get(&args);
            async move { result }
        })
    }
}

impl ModuleLoader for AlertModule {
    fn name(&self) -> String {
        "alert".to_string()
    }

    fn load(&self, script: &Script) -> Module {
        let script = Arc::new(script.clone());
        let module = REPORT_VERBS
            .iter()
            .fold(Module::new(), |module, (verb, level)| {
                module.with_function(*verb, self.report_fn(&script, *level))
            });
        module.with_function("get", self.get_fn())
    }
}

fn alert_value(alert: &Alert) -> ScriptValue {
    let mut map = BTreeMap::new();
    map.insert("name".to_string(), ScriptValue::from(alert.name()));
    map.insert("level".to_string(), ScriptValue::from(alert.level().as_str()));
    map.insert("count".to_string(), ScriptValue::from(alert.count()));
    map.insert(
        "last_change".to_string(),
        ScriptValue::from(alert.last_change().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    ScriptValue::Map(map)
}

/// Arguments of a report verb: `(name, text?, channels?, options?)`
#[derive(Debug, Default)]
struct ReportCall {
    name: String,
    text: String,
    channels: Option<Vec<String>>,
    options: ReportOptions,
}

#[derive(Debug, Default)]
struct ReportOptions {
    channels: Option<Vec<String>>,
    quiet: bool,
    repeat: u64,
    /// Everything not consumed here is passed through to channels
    message: MessageOptions,
}

impl ReportCall {
    fn parse(values: Vec<ScriptValue>) -> Result<Self, String> {
        let name = match values.first() {
            Some(ScriptValue::String(name)) if !name.is_empty() => name.clone(),
            Some(ScriptValue::String(_)) => return Err("alert name must not be empty".into()),
            Some(other) => {
                return Err(format!(
                    "alert name must be a string, got {}",
                    other.type_name()
                ))
            }
            None => return Err("alert name is required".into()),
        };

        let text = match values.get(1) {
            None | Some(ScriptValue::Nil) => String::new(),
            Some(_) => args::string(&values, 1)
                .ok_or_else(|| format!("alert text must be a string, got {}", values[1].type_name()))?,
        };

        // (name, text, options) is accepted as well as (name, text, channels, options)
        let (channels, options) = match values.get(2) {
            None | Some(ScriptValue::Nil) => (None, values.get(3)),
            Some(options @ ScriptValue::Map(_)) => (None, Some(options)),
            Some(channels) => (Some(args::string_list(channels)?), values.get(3)),
        };

        Ok(Self {
            name,
            text,
            channels,
            options: ReportOptions::parse(options)?,
        })
    }
}

impl ReportOptions {
    fn parse(value: Option<&ScriptValue>) -> Result<Self, String> {
        let map = match value {
            None | Some(ScriptValue::Nil) => return Ok(Self::default()),
            Some(ScriptValue::Map(map)) => map,
            Some(other) => return Err(format!("options must be a table, got {}", other.type_name())),
        };

        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "channels" => options.channels = Some(args::string_list(value)?),
                "quiet" => options.quiet = value.is_truthy(),
                "repeat" => {
                    options.repeat = match value {
                        ScriptValue::Nil => 0,
                        ScriptValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => *n as u64,
                        _ => return Err("repeat must be a non-negative integer".into()),
                    }
                }
                _ => {
                    options.message.insert(key.clone(), value.to_json());
                }
            }
        }

        Ok(options)
    }
}
