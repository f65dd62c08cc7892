//! Slack channel
//!
//! Posts messages with `chat.postMessage` using a bot or user token.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::channels::http::{endpoint, status_detail, ApiClient, ApiResponse};
use crate::channels::r#trait::Messenger;
use crate::error::{ChannelError, ChannelResult};

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack Web API client
pub struct SlackClient {
    http: ApiClient,
    token: SecretString,
    base_url: String,
}

impl SlackClient {
    pub fn new(token: SecretString) -> ChannelResult<Self> {
        Ok(Self {
            http: ApiClient::new()?,
            token,
            base_url: SLACK_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Post `text` to a channel as the token's user, with full link parsing
    pub async fn post_message(&self, channel: &str, text: &str) -> ChannelResult<()> {
        let base = self.http.url(&self.base_url)?;
        let url = endpoint(&base, &["chat.postMessage"])?;
        let payload = PostMessage {
            channel,
            text,
            as_user: true,
            parse: "full",
        };

        let request = self
            .http
            .request(Method::POST, url)
            .bearer_auth(self.token.expose_secret())
            .json(&payload);

        match self.http.execute(request).await? {
            ApiResponse::Success(body) => {
                let reply: SlackReply = serde_json::from_str(&body).map_err(|e| {
                    ChannelError::HttpError(format!("Unexpected Slack response: {}", e))
                })?;
                if reply.ok {
                    Ok(())
                } else {
                    Err(ChannelError::ResponseError {
                        provider: "Slack",
                        detail: reply.error.unwrap_or_else(|| "unknown_error".to_string()),
                    })
                }
            }
            ApiResponse::Error(code, body) => Err(ChannelError::ResponseError {
                provider: "Slack",
                detail: status_detail(code, &body),
            }),
        }
    }
}

#[async_trait]
impl Messenger for SlackClient {
    async fn send(&self, destination: &str, text: &str) -> ChannelResult<()> {
        self.post_message(destination, text).await
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    as_user: bool,
    parse: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlackReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}
