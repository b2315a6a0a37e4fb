//! Generic HTTP webhook channel

use std::collections::HashMap;

use async_trait::async_trait;

use super::{check_status, http_client, Channel};
use crate::config::WebhookChannelConfig;
use crate::notify::error::ChannelError;
use crate::notify::message::Message;

/// POSTs every message as JSON to a fixed URL
pub struct WebhookChannel {
    name: String,
    url: String,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(config: &WebhookChannelConfig) -> Result<Self, ChannelError> {
        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            headers: config.headers.clone(),
            client: http_client(config.timeout)?,
        })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "level": message.level,
            "alert_name": message.alert_name,
            "text": message.text,
            "options": message.options,
            "timestamp": message.timestamp.to_rfc3339(),
        });

        let mut request = self.client.post(&self.url).json(&payload);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        check_status(request.send().await?).await?;

        tracing::debug!(
            channel = %self.name,
            alert = %message.alert_name,
            "Webhook notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Level;
    use crate::notify::MessageOptions;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> WebhookChannelConfig {
        WebhookChannelConfig {
            name: "hook".to_string(),
            url,
            headers: HashMap::from([("X-Token".to_string(), "secret".to_string())]),
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_webhook_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("X-Token", "secret"))
            .and(body_partial_json(serde_json::json!({
                "level": "error",
                "alert_name": "disk",
                "text": "full",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(&config(format!("{}/hook", server.uri()))).unwrap();
        let message = Message::new(Level::Error, "disk", "full", MessageOptions::new());

        channel.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(&config(server.uri())).unwrap();
        let message = Message::new(Level::Warning, "disk", "filling", MessageOptions::new());

        let err = channel.send(&message).await.unwrap_err();
        assert!(matches!(err, ChannelError::Api(ref msg) if msg.contains("503")));
    }
}
