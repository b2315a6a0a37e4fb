//! Notification channel implementations

pub mod log;
pub mod slack;
pub mod syslog;
pub mod telegram;
pub mod webhook;

use async_trait::async_trait;

use super::error::ChannelError;
use super::message::Message;

pub use self::log::LogChannel;
pub use slack::SlackChannel;
pub use syslog::SyslogChannel;
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

/// A configured notification target
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique name within the dispatcher
    fn name(&self) -> &str;

    /// Deliver one message
    async fn send(&self, message: &Message) -> Result<(), ChannelError>;
}

/// HTTP client shared by the HTTP based channels
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ChannelError::Http)
}

/// Fail on a non-2xx status, keeping the body for the error message
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChannelError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Api(format!("status {}: {}", status, body.trim())))
}
