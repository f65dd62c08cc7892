//! Discord channel
//!
//! Sends channel messages through the REST API with a bot token; no
//! gateway connection is opened.

use async_trait::async_trait;
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::channels::http::{endpoint, status_detail, ApiClient, ApiResponse};
use crate::channels::r#trait::Messenger;
use crate::error::{ChannelError, ChannelResult};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord REST client authenticated as a bot
pub struct DiscordClient {
    http: ApiClient,
    token: SecretString,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: SecretString) -> ChannelResult<Self> {
        if token.expose_secret().is_empty() {
            return Err(ChannelError::InvalidConfig("Discord token is empty".to_string()));
        }

        Ok(Self {
            http: ApiClient::new()?,
            token,
            base_url: DISCORD_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn channel_message_send(&self, channel_id: &str, content: &str) -> ChannelResult<()> {
        let url = self.messages_url(channel_id)?;

        let request = self
            .http
            .request(Method::POST, url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", self.token.expose_secret()),
            )
            .json(&CreateMessage { content });

        match self.http.execute(request).await? {
            ApiResponse::Success(_) => Ok(()),
            ApiResponse::Error(code, body) => {
                let detail = match serde_json::from_str::<DiscordError>(&body) {
                    Ok(err) => format!("HTTP {}: {}", code, err.message),
                    Err(_) => status_detail(code, &body),
                };
                Err(ChannelError::ResponseError {
                    provider: "Discord",
                    detail,
                })
            }
        }
    }

    fn messages_url(&self, channel_id: &str) -> ChannelResult<Url> {
        let base = self.http.url(&self.base_url)?;
        endpoint(&base, &["channels", channel_id, "messages"])
    }
}

#[async_trait]
impl Messenger for DiscordClient {
    async fn send(&self, destination: &str, text: &str) -> ChannelResult<()> {
        self.channel_message_send(destination, text).await
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct DiscordError {
    message: String,
}
