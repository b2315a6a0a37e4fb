//! Telegram Bot API channel

use async_trait::async_trait;
use serde::Deserialize;

use super::{check_status, http_client, Channel};
use crate::config::TelegramChannelConfig;
use crate::notify::error::ChannelError;
use crate::notify::message::Message;

pub struct TelegramChannel {
    name: String,
    chat_id: i64,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(config: &TelegramChannelConfig) -> Result<Self, ChannelError> {
        Ok(Self {
            name: config.name.clone(),
            chat_id: config.chat_id,
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
            client: http_client(config.timeout)?,
        })
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        // Photo captions carry the text when an image is attached
        let (method, payload) = match message.image() {
            Some(image) => (
                "sendPhoto",
                serde_json::json!({
                    "chat_id": self.chat_id,
                    "photo": image,
                    "caption": message.render_text(),
                }),
            ),
            None => (
                "sendMessage",
                serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": message.render_text(),
                }),
            ),
        };

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(&payload)
            .send()
            .await
            .map_err(redacted)?;

        let body: TelegramResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(redacted)?;
        if !body.ok {
            return Err(ChannelError::Api(
                body.description
                    .unwrap_or_else(|| "unknown telegram error".to_string()),
            ));
        }

        Ok(())
    }
}

/// Request URLs embed the bot token, so they never reach error messages
fn redacted(error: reqwest::Error) -> ChannelError {
    ChannelError::Http(error.without_url())
}
