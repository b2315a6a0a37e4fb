//! Slack channel using `chat.postMessage`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, Channel};
use crate::alert::Level;
use crate::config::SlackChannelConfig;
use crate::notify::error::ChannelError;
use crate::notify::message::Message;

pub struct SlackChannel {
    name: String,
    token: String,
    channel: String,
    api_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: String,
    attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct Attachment {
    color: &'static str,
    fallback: String,
    fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    ts: i64,
}

#[derive(Serialize)]
struct Field {
    title: String,
    value: String,
    short: bool,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackChannel {
    pub fn new(config: &SlackChannelConfig) -> Result<Self, ChannelError> {
        Ok(Self {
            name: config.name.clone(),
            token: config.token.clone(),
            channel: config.channel.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client: http_client(config.timeout)?,
        })
    }

    fn color(level: Level) -> &'static str {
        match level {
            Level::Success => "#2eb886",
            Level::Warning => "#f39c12",
            Level::Error => "#e74c3c",
        }
    }

    fn payload<'a>(&'a self, message: &Message) -> PostMessage<'a> {
        let fields = message
            .fields()
            .into_iter()
            .map(|(title, value)| Field {
                title,
                value,
                short: true,
            })
            .collect();

        PostMessage {
            channel: &self.channel,
            text: message.summary(),
            attachments: vec![Attachment {
                color: Self::color(message.level),
                fallback: message.summary(),
                fields,
                image_url: message.image().map(str::to_string),
                ts: message.timestamp.timestamp(),
            }],
        }
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(&self.payload(message))
            .send()
            .await?;

        let body: SlackResponse = check_status(response).await?.json().await?;
        if !body.ok {
            return Err(ChannelError::Api(
                body.error.unwrap_or_else(|| "unknown slack error".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MessageOptions;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(api_url: String) -> SlackChannel {
        SlackChannel::new(&SlackChannelConfig {
            name: "slack".to_string(),
            token: "xoxb-test".to_string(),
            channel: "#alerts".to_string(),
            api_url,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_slack_post_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(serde_json::json!({
                "channel": "#alerts",
                "text": "[ERROR] disk: full",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let message = Message::new(Level::Error, "disk", "full", MessageOptions::new());
        channel(server.uri()).send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_slack_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let message = Message::new(Level::Warning, "disk", "filling", MessageOptions::new());
        let err = channel(server.uri()).send(&message).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: channel_not_found");
    }
}
