//! Error types for babybutton
//!
//! This module defines structured error types using the `thiserror` crate.
//! Fatal errors abort the run before any message is sent; channel errors
//! only ever abort a single channel or skip a single recipient.

use std::io;
use thiserror::Error;

use crate::config::{ConfigError, ValidationError};
use crate::secrets::SecretStoreError;

/// Fatal error for a babybutton run
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Configuration file could not be read or parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration parsed but breaks a cross-field rule
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Secret store client could not be constructed
    #[error("Error creating vault client: {0}")]
    SecretStore(#[from] SecretStoreError),

    /// Bearer token for the secret store is not set
    #[error("{0} must be set")]
    MissingToken(&'static str),

    /// I/O error, e.g. while starting the async runtime
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Error raised by a provider client while connecting or sending
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Client could not be built from the resolved credentials
    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// Provider answered but refused the request
    #[error("{provider} API error: {detail}")]
    ResponseError {
        provider: &'static str,
        detail: String,
    },

    /// Federated-room join was refused
    #[error("failed to join {room}: {reason}")]
    JoinFailed { room: String, reason: String },

    /// A credential field expected in the bundle is absent
    #[error("missing credential {0}")]
    MissingCredential(&'static str),
}

impl ChannelError {
    /// Map a reqwest failure the same way for every provider
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChannelError::Timeout
        } else {
            ChannelError::HttpError(err.to_string())
        }
    }
}

/// Result type alias for fatal operations
pub type Result<T> = std::result::Result<T, NotificationError>;

/// Result type for channel operations
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
