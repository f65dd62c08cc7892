//! Notification channels module
//!
//! This module provides the per-channel descriptor, the provider clients
//! for Slack, Twilio SMS, Matrix and Discord, and the connector that builds
//! a provider client from a resolved credential bundle.

pub mod discord;
pub mod http;
pub mod matrix;
pub mod slack;
pub mod r#trait;
pub mod twilio;

pub use discord::DiscordClient;
pub use http::{ApiClient, ApiResponse};
pub use matrix::MatrixClient;
pub use r#trait::{Connector, Messenger};
pub use slack::SlackClient;
pub use twilio::TwilioClient;

use async_trait::async_trait;
use std::fmt;

use crate::error::ChannelResult;
use crate::secrets::Credentials;

/// One of the four supported messaging surfaces
///
/// Everything that differs between channels at the configuration and
/// secret-store level is described here; the provider clients cover the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Slack,
    Sms,
    Matrix,
    Discord,
}

impl ChannelKind {
    /// Dispatch and validation order
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Slack,
        ChannelKind::Sms,
        ChannelKind::Matrix,
        ChannelKind::Discord,
    ];

    /// Configuration block type for this channel's targets
    pub fn block_name(self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack_message",
            ChannelKind::Sms => "sms",
            ChannelKind::Matrix => "matrix_message",
            ChannelKind::Discord => "discord_message",
        }
    }

    pub fn from_block_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.block_name() == name)
    }

    /// Attribute holding the channel-specific destination
    pub fn destination_attr(self) -> &'static str {
        match self {
            ChannelKind::Slack | ChannelKind::Discord => "channel_id",
            ChannelKind::Sms => "number",
            ChannelKind::Matrix => "room_id",
        }
    }

    /// Secret name under `{mount_path}/data/`
    pub fn secret_name(self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack",
            ChannelKind::Sms => "twilio",
            ChannelKind::Matrix => "matrix",
            ChannelKind::Discord => "discord",
        }
    }

    /// Credential fields the provider client needs
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ChannelKind::Slack => &["auth_token"],
            ChannelKind::Sms => &["account_sid", "auth_token", "number"],
            ChannelKind::Matrix => &["homeserver_url", "user_id", "access_token"],
            ChannelKind::Discord => &["token"],
        }
    }

    /// Provider name for log lines
    pub fn provider(self) -> &'static str {
        match self {
            ChannelKind::Slack => "Slack",
            ChannelKind::Sms => "Twilio",
            ChannelKind::Matrix => "Matrix",
            ChannelKind::Discord => "Discord",
        }
    }

    /// What a single delivery is called in log lines
    pub fn noun(self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack message",
            ChannelKind::Sms => "text message",
            ChannelKind::Matrix => "matrix message",
            ChannelKind::Discord => "discord message",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.secret_name())
    }
}

/// Provider API base URLs
///
/// Matrix has no entry: its homeserver comes from the credential bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub slack: String,
    pub twilio: String,
    pub discord: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            slack: slack::SLACK_API_BASE.to_string(),
            twilio: twilio::TWILIO_API_BASE.to_string(),
            discord: discord::DISCORD_API_BASE.to_string(),
        }
    }
}

/// Builds real provider clients over HTTPS
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    endpoints: Endpoints,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        kind: ChannelKind,
        credentials: &Credentials,
    ) -> ChannelResult<Box<dyn Messenger>> {
        let messenger: Box<dyn Messenger> = match kind {
            ChannelKind::Slack => Box::new(
                SlackClient::new(credentials.secret("auth_token")?)?
                    .with_base_url(&self.endpoints.slack),
            ),
            ChannelKind::Sms => Box::new(
                TwilioClient::new(
                    credentials.get("account_sid")?,
                    credentials.secret("auth_token")?,
                    credentials.get("number")?,
                )?
                .with_base_url(&self.endpoints.twilio),
            ),
            ChannelKind::Matrix => Box::new(
                MatrixClient::connect(
                    credentials.get("homeserver_url")?,
                    credentials.get("user_id")?,
                    credentials.secret("access_token")?,
                )
                .await?,
            ),
            ChannelKind::Discord => Box::new(
                DiscordClient::new(credentials.secret("token")?)?
                    .with_base_url(&self.endpoints.discord),
            ),
        };
        Ok(messenger)
    }
}
