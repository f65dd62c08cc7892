//! Secret store access
//!
//! Channel credentials live in a Vault KV v2 engine at
//! `{mount_path}/data/{channel}`. The resolver reads that path once per
//! channel and extracts each required string field, reporting exactly which
//! field is absent or malformed.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::channels::ChannelKind;
use crate::config::{VaultSettings, DEFAULT_VAULT_ADDR, VAULT_ADDR_ENV};
use crate::error::{ChannelError, ChannelResult};

/// Failure talking to the secret store itself
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Error making API request to {path}: code {status}: {detail}")]
    Status {
        path: String,
        status: u16,
        detail: String,
    },

    #[error("failed to decode response for {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Failure resolving one channel's credentials
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(transparent)]
    Read(#[from] SecretStoreError),

    #[error("no secret found at {0}")]
    NotFound(String),

    #[error("No data key in response from Vault for {location}")]
    NoData { location: String },

    #[error("Data key in response from Vault for {location} wasn't an object, it was {found}")]
    DataNotObject { location: String, found: &'static str },

    #[error("No {field} data set in {location} in vault")]
    MissingField { field: String, location: String },

    #[error("{field} data set in {location} in vault wasn't string, was {found}")]
    WrongType {
        field: String,
        location: String,
        found: &'static str,
    },
}

/// Read access to a key-value secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`; `None` when nothing is stored there
    ///
    /// The returned map is the response's top-level `data` object.
    async fn read(&self, path: &str) -> Result<Option<Map<String, Value>>, SecretStoreError>;
}

/// HashiCorp Vault client using token authentication
pub struct VaultClient {
    http: Client,
    address: Url,
    token: Option<SecretString>,
}

impl VaultClient {
    pub fn new(address: &str) -> Result<Self, SecretStoreError> {
        let invalid = |reason: String| SecretStoreError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        let address = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
        if address.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let http = Client::builder()
            .build()
            .map_err(|e| SecretStoreError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            address,
            token: None,
        })
    }

    /// Build from config, falling back to `VAULT_ADDR` and then the default address
    pub fn from_settings(settings: &VaultSettings) -> Result<Self, SecretStoreError> {
        let env_address = std::env::var(VAULT_ADDR_ENV).ok();
        Self::new(&resolve_address(settings, env_address.as_deref()))
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    fn logical_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.address.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Address from the config file, else from the environment, else the default
pub fn resolve_address(settings: &VaultSettings, env_address: Option<&str>) -> String {
    if !settings.address.is_empty() {
        return settings.address.clone();
    }
    match env_address {
        Some(address) if !address.is_empty() => address.to_string(),
        _ => DEFAULT_VAULT_ADDR.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct LogicalResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read(&self, path: &str) -> Result<Option<Map<String, Value>>, SecretStoreError> {
        let url = self.logical_url(path);
        debug!(path, "Reading secret");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token.expose_secret().as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SecretStoreError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SecretStoreError::Http(format!("Failed to read response body: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let errors: VaultErrors = serde_json::from_str(&body).unwrap_or_default();
            let detail = if errors.errors.is_empty() {
                body.trim().to_string()
            } else {
                errors.errors.join("; ")
            };
            return Err(SecretStoreError::Status {
                path: url,
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: LogicalResponse =
            serde_json::from_str(&body).map_err(|e| SecretStoreError::Decode {
                path: url,
                reason: e.to_string(),
            })?;
        Ok(Some(parsed.data.unwrap_or_default()))
    }
}

/// Resolved credential fields for one channel
///
/// Values are never printed; `Debug` lists field names only.
pub struct Credentials {
    source: String,
    values: HashMap<String, SecretString>,
}

impl Credentials {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: &str, value: String) {
        self.values
            .insert(field.to_string(), SecretString::new(value));
    }

    /// Where the fields came from, e.g. `secret/slack`
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Plain value of a field, for non-secret identifiers like account IDs
    pub fn get(&self, field: &'static str) -> ChannelResult<&str> {
        self.values
            .get(field)
            .map(|v| v.expose_secret().as_str())
            .ok_or(ChannelError::MissingCredential(field))
    }

    pub fn secret(&self, field: &'static str) -> ChannelResult<SecretString> {
        self.values
            .get(field)
            .cloned()
            .ok_or(ChannelError::MissingCredential(field))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.values.keys().collect();
        fields.sort();
        f.debug_struct("Credentials")
            .field("source", &self.source)
            .field("fields", &fields)
            .finish()
    }
}

/// Fetches channel credentials below one mount path
pub struct SecretResolver<S> {
    store: S,
    mount_path: String,
}

impl<S: SecretStore> SecretResolver<S> {
    pub fn new(store: S, mount_path: &str) -> Self {
        Self {
            store,
            mount_path: mount_path.trim_matches('/').to_string(),
        }
    }

    /// KV v2 read path for a channel
    pub fn secret_path(&self, channel: &str) -> String {
        format!("{}/data/{}", self.mount_path, channel)
    }

    /// Human-facing location used in error messages
    fn source(&self, channel: &str) -> String {
        format!("{}/{}", self.mount_path, channel)
    }

    async fn read_bundle(&self, channel: &str) -> Result<Map<String, Value>, CredentialError> {
        let path = self.secret_path(channel);
        self.store
            .read(&path)
            .await?
            .ok_or(CredentialError::NotFound(path))
    }

    /// Read one string field of a channel's secret
    pub async fn fetch_credential(
        &self,
        channel: &str,
        field: &str,
    ) -> Result<SecretString, CredentialError> {
        let secret = self.read_bundle(channel).await?;
        extract_field(&secret, field, &self.source(channel)).map(SecretString::new)
    }

    /// Read a channel's secret once and extract all of its required fields
    pub async fn resolve(&self, kind: ChannelKind) -> Result<Credentials, CredentialError> {
        let channel = kind.secret_name();
        let secret = self.read_bundle(channel).await?;
        let source = self.source(channel);

        let mut credentials = Credentials::new(&source);
        for field in kind.required_fields() {
            credentials.insert(field, extract_field(&secret, field, &source)?);
        }
        Ok(credentials)
    }
}

/// Pull `data.<field>` out of a KV v2 secret as a string
pub fn extract_field(
    secret: &Map<String, Value>,
    field: &str,
    source: &str,
) -> Result<String, CredentialError> {
    let data = secret.get("data").ok_or_else(|| CredentialError::NoData {
        location: source.to_string(),
    })?;
    let data = data.as_object().ok_or_else(|| CredentialError::DataNotObject {
        location: source.to_string(),
        found: json_type_name(data),
    })?;

    let value = data.get(field).ok_or_else(|| CredentialError::MissingField {
        field: field.to_string(),
        location: source.to_string(),
    })?;

    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(CredentialError::WrongType {
            field: field.to_string(),
            location: source.to_string(),
            found: json_type_name(other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
