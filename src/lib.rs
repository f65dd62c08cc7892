//! Core dispatch logic for babybutton
//!
//! Loads a declarative list of recipients across Slack, Twilio SMS, Matrix
//! and Discord, fetches each channel's credentials from Vault and sends
//! every recipient one message. Runs once, then returns.

mod channels;
mod config;
mod dispatch;
mod emoji;
mod error;
mod logging;
mod secrets;

use secrecy::SecretString;
use tokio::runtime::Runtime;
use tracing::debug;

pub use channels::{
    ApiClient, ApiResponse, ChannelKind, Connector, DiscordClient, Endpoints, HttpConnector,
    MatrixClient, Messenger, SlackClient, TwilioClient,
};
pub use config::{
    load_config, load_config_from_path, parse_config, Config, ConfigError, Defaults, Target,
    ValidationError, VaultSettings, DEFAULT_VAULT_ADDR, VAULT_ADDR_ENV, VAULT_TOKEN_ENV,
};
pub use dispatch::{dispatch_all, dispatch_channel, ChannelOutcome, ChannelReport};
pub use emoji::parse as parse_emoji;
pub use error::{ChannelError, ChannelResult, NotificationError, Result};
pub use logging::init as init_logging;
pub use secrets::{
    extract_field, resolve_address, CredentialError, Credentials, SecretResolver, SecretStore,
    SecretStoreError, VaultClient,
};

/// One configured run against the real secret store and providers
pub struct Notifier {
    config: Config,
    resolver: SecretResolver<VaultClient>,
    connector: HttpConnector,
}

impl Notifier {
    /// Load and validate a config file, then connect with `VAULT_TOKEN`
    pub fn from_file(path: &str) -> Result<Self> {
        Self::from_file_with_token(path, std::env::var(VAULT_TOKEN_ENV).ok())
    }

    pub fn from_file_with_token(path: &str, token: Option<String>) -> Result<Self> {
        let config = load_config(path)?;
        Self::validated(config, token)
    }

    /// Validate `config` before the Vault client or token are looked at
    pub fn validated(config: Config, token: Option<String>) -> Result<Self> {
        config.validate()?;
        Self::with_token(config, token)
    }

    /// Build the Vault client, then pick up the token from `VAULT_TOKEN`
    pub fn new(config: Config) -> Result<Self> {
        let token = std::env::var(VAULT_TOKEN_ENV).ok();
        Self::with_token(config, token)
    }

    /// Same as [`Notifier::new`] with an explicit token
    pub fn with_token(config: Config, token: Option<String>) -> Result<Self> {
        let vault = VaultClient::from_settings(&config.vault)?;

        let token = match token {
            Some(token) if !token.is_empty() => SecretString::new(token),
            _ => return Err(NotificationError::MissingToken(VAULT_TOKEN_ENV)),
        };
        debug!(address = %vault.address(), "Vault client ready");

        let resolver = SecretResolver::new(vault.with_token(token), config.vault.mount_path());
        Ok(Self {
            config,
            resolver,
            connector: HttpConnector::new(),
        })
    }

    /// Override provider API base URLs
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.connector = HttpConnector::with_endpoints(endpoints);
        self
    }

    /// Dispatch every channel on a fresh runtime
    pub fn send_all(&self) -> Result<Vec<ChannelReport>> {
        let runtime = Runtime::new()?;
        Ok(runtime.block_on(self.send_all_async()))
    }

    pub async fn send_all_async(&self) -> Vec<ChannelReport> {
        dispatch_all(&self.config, &self.resolver, &self.connector).await
    }
}
