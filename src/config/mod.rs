//! Configuration management module
//!
//! This module handles loading and validating the declarative
//! configuration that lists every recipient of a run.

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::{load_config, load_config_from_path, parse_config, ConfigError};
pub use schema::{Config, Defaults, Target, VaultSettings};
pub use validate::ValidationError;

/// Environment variable holding the secret store bearer token
pub const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

/// Environment variable consulted when `vault.address` is empty
pub const VAULT_ADDR_ENV: &str = "VAULT_ADDR";

/// Secret store address used when neither the file nor the environment sets one
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
