//! Engine wiring: one registry, one dispatcher and the datasource set

use std::sync::Arc;

use crate::alert::AlertRegistry;
use crate::config::Config;
use crate::datasource::{Datasource, DatasourceError, PostgresDatasource, PrometheusDatasource};
use crate::notify::channels::{
    LogChannel, SlackChannel, SyslogChannel, TelegramChannel, WebhookChannel,
};
use crate::notify::{Channel, ChannelError, Dispatcher, DispatcherError};
use crate::script::{AlertModule, DatasourceModule, Script, ScriptEnv};

/// Process-wide state shared by every script execution
pub struct Engine {
    registry: Arc<AlertRegistry>,
    dispatcher: Arc<Dispatcher>,
    datasources: Vec<Arc<dyn Datasource>>,
}

impl Engine {
    /// Build every configured channel and datasource
    ///
    /// Must run inside a Tokio runtime; datasource pools are created here
    /// but connect on first use.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let dispatcher = build_dispatcher(config)?;
        let datasources = build_datasources(config)?;

        tracing::info!(
            channels = dispatcher.len(),
            datasources = datasources.len(),
            "Engine ready"
        );

        Ok(Self::new(
            Arc::new(AlertRegistry::new()),
            Arc::new(dispatcher),
            datasources,
        ))
    }

    pub fn new(
        registry: Arc<AlertRegistry>,
        dispatcher: Arc<Dispatcher>,
        datasources: Vec<Arc<dyn Datasource>>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            datasources,
        }
    }

    /// Environment for one script execution: the `alert` module plus one
    /// `<kind>.<name>` module per datasource
    pub fn script_env(&self, script: &Script) -> ScriptEnv {
        let mut env = ScriptEnv::new(script.clone());
        env.register(&AlertModule::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
        ));
        for datasource in &self.datasources {
            env.register(&DatasourceModule::new(Arc::clone(datasource)));
        }
        env
    }

    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn datasources(&self) -> &[Arc<dyn Datasource>] {
        &self.datasources
    }
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher, EngineError> {
    let channels = &config.channels;
    let mut built: Vec<Arc<dyn Channel>> = Vec::with_capacity(channels.len());

    for c in &channels.log {
        built.push(Arc::new(LogChannel::from_config(c)));
    }
    for c in &channels.webhook {
        built.push(Arc::new(WebhookChannel::new(c).map_err(channel_error(&c.name))?));
    }
    for c in &channels.slack {
        built.push(Arc::new(SlackChannel::new(c).map_err(channel_error(&c.name))?));
    }
    for c in &channels.telegram {
        built.push(Arc::new(TelegramChannel::new(c).map_err(channel_error(&c.name))?));
    }
    for c in &channels.syslog {
        built.push(Arc::new(SyslogChannel::new(c).map_err(channel_error(&c.name))?));
    }

    let mut dispatcher = Dispatcher::new();
    for channel in built {
        dispatcher.register_channel(channel)?;
    }
    Ok(dispatcher)
}

fn channel_error(name: &str) -> impl FnOnce(ChannelError) -> EngineError + '_ {
    move |source| EngineError::Channel {
        name: name.to_string(),
        source,
    }
}

fn build_datasources(config: &Config) -> Result<Vec<Arc<dyn Datasource>>, EngineError> {
    let sources = &config.datasources;
    let mut built: Vec<Arc<dyn Datasource>> = Vec::with_capacity(sources.len());

    for c in &sources.postgres {
        let ds = PostgresDatasource::new(c).map_err(|source| EngineError::Datasource {
            name: c.name.clone(),
            source,
        })?;
        built.push(Arc::new(ds));
    }
    for c in &sources.prometheus {
        let ds = PrometheusDatasource::new(c).map_err(|source| EngineError::Datasource {
            name: c.name.clone(),
            source,
        })?;
        built.push(Arc::new(ds));
    }

    Ok(built)
}

/// Startup faults
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("channel '{name}': {source}")]
    Channel {
        name: String,
        #[source]
        source: ChannelError,
    },

    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    #[error("datasource '{name}': {source}")]
    Datasource {
        name: String,
        #[source]
        source: DatasourceError,
    },
}
