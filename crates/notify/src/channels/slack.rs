//! Slack Web API channel (`chat.postMessage`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::{MessageRef, ThreadedChannel};

/// Environment variable for the Slack bot token.
const ENV_SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";

/// Slack `chat.postMessage` endpoint.
pub const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Slack bot channel posting through the Web API.
pub struct SlackChannel {
    token: Option<String>,
    channel: String,
    api_url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a Slack channel reading the bot token from environment variables.
    #[must_use]
    pub fn from_env(channel: impl Into<String>) -> Self {
        let token = std::env::var(ENV_SLACK_BOT_TOKEN)
            .ok()
            .filter(|t| !t.is_empty());

        if token.is_some() {
            debug!("Slack notifications enabled");
        } else {
            debug!("Slack notifications disabled (SLACK_BOT_TOKEN not set)");
        }

        Self {
            token,
            channel: channel.into(),
            api_url: SLACK_POST_MESSAGE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a Slack channel with a specific token.
    #[must_use]
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            channel: channel.into(),
            api_url: SLACK_POST_MESSAGE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl ThreadedChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.token.is_some()
    }

    async fn post(
        &self,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_SLACK_BOT_TOKEN.to_string()))?;

        let payload = PostMessage {
            channel: &self.channel,
            text,
            thread_ts: thread.map(MessageRef::as_str),
        };

        debug!(
            channel = "slack",
            threaded = thread.is_some(),
            "Posting message"
        );

        let response: PostMessageResponse = self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown_error".to_string());
            warn!(channel = "slack", error = %error, "Slack API rejected message");
            return Err(ChannelError::Api(error));
        }

        response
            .ts
            .map(MessageRef::new)
            .ok_or(ChannelError::MissingReference)
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer) -> SlackChannel {
        SlackChannel::new("xoxb-test", "#pod-restarts").with_api_url(server.uri())
    }

    #[tokio::test]
    async fn test_parent_post_returns_ts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_json(json!({"channel": "#pod-restarts", "text": "hello"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1700.01"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let msg_ref = channel(&server).post("hello", None).await.unwrap();
        assert_eq!(msg_ref.as_str(), "1700.01");
    }

    #[tokio::test]
    async fn test_reply_carries_thread_ts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "channel": "#pod-restarts",
                "text": "reply",
                "thread_ts": "1700.01"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1700.02"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let parent = MessageRef::new("1700.01");
        channel(&server).post("reply", Some(&parent)).await.unwrap();
    }

    #[tokio::test]
    async fn test_logical_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let err = channel(&server).post("hello", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn test_missing_ts_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = channel(&server).post("hello", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::MissingReference));
    }

    #[tokio::test]
    async fn test_unconfigured_channel_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut slack = channel(&server);
        slack.token = None;
        assert!(!slack.enabled());
        let err = slack.post("hello", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }
}
