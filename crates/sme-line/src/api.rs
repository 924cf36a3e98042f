//! LINE Messaging API client
//!
//! Communicates with LINE Messaging API

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, info};

use sme_core::LineConfig;

use crate::error::{LineError, Result};
use crate::types::*;

/// LINE allows up to 5 messages per reply/push call
const MAX_MESSAGES_PER_CALL: usize = 5;

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineApiClient {
    client: Client,
    content_client: Client,
    channel_access_token: String,
    api_base_url: String,
    data_base_url: String,
}

impl LineApiClient {
    /// Create a new LINE API client
    pub fn new(config: &LineConfig) -> Result<Self> {
        if config.channel_access_token.is_empty() {
            return Err(LineError::AccessTokenNotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(LineError::HttpError)?;
        let content_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(LineError::HttpError)?;

        Ok(Self {
            client,
            content_client,
            channel_access_token: config.channel_access_token.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Add authorization header
    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.channel_access_token)
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        error!("{} failed: {} - {}", what, status, error_text);
        Err(LineError::ApiError(format!("{}: {}", status, error_text)))
    }

    /// Get user profile
    pub async fn get_profile(&self, user_id: &str) -> Result<LineProfile> {
        let url = format!("{}/v2/bot/profile/{}", self.api_base_url, user_id);

        debug!("Getting profile for user: {}", user_id);

        let response = self
            .add_auth(self.client.get(&url))
            .send()
            .await
            .map_err(LineError::HttpError)?;
        let response = Self::check_status(response, "Get profile").await?;

        let profile: LineProfile = response
            .json()
            .await
            .map_err(|e| LineError::ParseError(e.to_string()))?;

        info!("Got profile for user: {}", profile.display_name);
        Ok(profile)
    }

    /// Reply to an event with one text message
    pub async fn reply_message(&self, reply_token: &str, text: &str) -> Result<()> {
        self.reply_messages(reply_token, &[text.to_string()]).await
    }

    /// Reply with up to five text messages
    pub async fn reply_messages(&self, reply_token: &str, texts: &[String]) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_base_url);

        let body = ReplyMessage {
            reply_token: reply_token.to_string(),
            messages: texts
                .iter()
                .take(MAX_MESSAGES_PER_CALL)
                .map(MessageContent::text)
                .collect(),
        };

        debug!("Replying with {} message(s)", body.messages.len());

        let response = self
            .add_auth(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(LineError::HttpError)?;
        Self::check_status(response, "Reply message").await?;

        Ok(())
    }

    /// Push several messages, five per API call
    pub async fn push_messages(&self, to: &str, texts: &[String]) -> Result<()> {
        let url = format!("{}/v2/bot/message/push", self.api_base_url);

        for (i, chunk) in texts.chunks(MAX_MESSAGES_PER_CALL).enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            let body = PushMessage {
                to: to.to_string(),
                messages: chunk.iter().map(MessageContent::text).collect(),
            };

            debug!("Pushing {} message(s) to: {}", body.messages.len(), to);

            let response = self
                .add_auth(self.client.post(&url).json(&body))
                .send()
                .await
                .map_err(LineError::HttpError)?;
            Self::check_status(response, "Push message").await?;
        }

        Ok(())
    }

    /// Download the binary content of an image/file message
    pub async fn get_message_content(&self, message_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v2/bot/message/{}/content", self.data_base_url, message_id);

        debug!("Downloading content for message: {}", message_id);

        let response = self
            .add_auth(self.content_client.get(&url))
            .send()
            .await
            .map_err(LineError::HttpError)?;
        let response = Self::check_status(response, "Get message content").await?;

        let bytes = response.bytes().await.map_err(LineError::HttpError)?;
        info!("Downloaded {} bytes for message {}", bytes.len(), message_id);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LineConfig {
        LineConfig {
            channel_access_token: "test-token".to_string(),
            channel_secret: "secret".to_string(),
            api_base_url: server.uri(),
            data_base_url: server.uri(),
        }
    }

    #[test]
    fn test_requires_access_token() {
        let result = LineApiClient::new(&LineConfig::default());
        assert!(matches!(result, Err(LineError::AccessTokenNotConfigured)));
    }

    #[tokio::test]
    async fn test_reply_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/reply"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "replyToken": "r1",
                "messages": [{"type": "text", "text": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = LineApiClient::new(&config_for(&server)).unwrap();
        client.reply_message("r1", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/reply"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid reply token"))
            .mount(&server)
            .await;

        let client = LineApiClient::new(&config_for(&server)).unwrap();
        let err = client.reply_message("expired", "hello").await.unwrap_err();
        assert!(matches!(err, LineError::ApiError(msg) if msg.contains("Invalid reply token")));
    }

    #[tokio::test]
    async fn test_push_messages_chunks_by_five() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = LineApiClient::new(&config_for(&server)).unwrap();
        let texts: Vec<String> = (0..7).map(|i| format!("part {}", i)).collect();
        client.push_messages("U1", &texts).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_profile_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/profile/U1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"displayName": "Somchai", "userId": "U1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/message/m1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let client = LineApiClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.get_profile("U1").await.unwrap().display_name, "Somchai");
        assert_eq!(client.get_message_content("m1").await.unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }
}
