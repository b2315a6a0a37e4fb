//! Per-channel isolated fan-out

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use super::channels::Channel;
use super::message::{Message, MessageOptions};
use crate::alert::Level;

/// What happened to one channel during a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// Channel not in a non-empty addressed set
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub status: DeliveryStatus,
}

/// Per-channel outcomes of one dispatch, in channel name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn delivered(&self) -> Vec<&str> {
        self.filter(|s| matches!(s, DeliveryStatus::Delivered))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.filter(|s| matches!(s, DeliveryStatus::Skipped))
    }

    /// `(channel, error)` for every failed send
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                DeliveryStatus::Failed(err) => Some((o.channel.as_str(), err.as_str())),
                _ => None,
            })
            .collect()
    }

    fn filter(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| pred(&o.status))
            .map(|o| o.channel.as_str())
            .collect()
    }
}

/// Holds the channel table and fans alert transitions out to it
///
/// Channels are registered at startup through `&mut self`; once shared
/// behind an `Arc` the table is read-only.
#[derive(Default)]
pub struct Dispatcher {
    channels: BTreeMap<String, Arc<dyn Channel>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_channel(&mut self, channel: Arc<dyn Channel>) -> Result<(), DispatcherError> {
        let name = channel.name().to_string();
        if self.channels.contains_key(&name) {
            return Err(DispatcherError::DuplicateChannel(name));
        }

        tracing::debug!(channel = %name, "Registered notification channel");
        self.channels.insert(name, channel);
        Ok(())
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver one alert event to every applicable channel
    ///
    /// An empty `addressed` set means all channels. Each send runs in its
    /// own task and every attempted channel is awaited before returning.
    /// Failures are logged and recorded in the report, never returned.
    pub async fn dispatch(
        &self,
        level: Level,
        alert_name: &str,
        text: &str,
        addressed: &[String],
        options: &MessageOptions,
    ) -> DispatchReport {
        if self.channels.is_empty() {
            return DispatchReport::default();
        }

        for name in addressed {
            if !self.channels.contains_key(name) {
                tracing::warn!(
                    channel = %name,
                    alert = %alert_name,
                    "Addressed channel is not configured"
                );
            }
        }

        let sends = self.channels.iter().map(|(name, channel)| {
            let skip = !addressed.is_empty() && !addressed.iter().any(|a| a == name);
            let send = (!skip).then(|| {
                let channel = Arc::clone(channel);
                let message = Message::new(level, alert_name, text, options.clone());
                tokio::spawn(async move { channel.send(&message).await })
            });

            async move {
                let status = match send {
                    None => {
                        tracing::debug!(
                            channel = %name,
                            alert = %alert_name,
                            "skip send message to channel"
                        );
                        DeliveryStatus::Skipped
                    }
                    Some(handle) => match handle.await {
                        Ok(Ok(())) => DeliveryStatus::Delivered,
                        Ok(Err(e)) => {
                            tracing::error!(
                                channel = %name,
                                alert = %alert_name,
                                error = %e,
                                "error send message to channel"
                            );
                            DeliveryStatus::Failed(e.to_string())
                        }
                        Err(e) => {
                            tracing::error!(
                                channel = %name,
                                alert = %alert_name,
                                error = %e,
                                "error send message to channel"
                            );
                            DeliveryStatus::Failed(format!("channel task failed: {}", e))
                        }
                    },
                };

                ChannelOutcome {
                    channel: name.clone(),
                    status,
                }
            }
        });

        DispatchReport {
            outcomes: join_all(sends).await,
        }
    }
}

/// Dispatcher setup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatcherError {
    #[error("duplicate channel name: {0}")]
    DuplicateChannel(String),
}
