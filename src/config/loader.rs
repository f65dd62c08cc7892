//! Configuration file loading
//!
//! Reads the HCL configuration file and maps its blocks onto the typed
//! schema. Attribute expressions are evaluated without variables or
//! functions, so only literal values (strings, heredocs, numbers, bools)
//! are accepted.

use hcl::eval::{Context, Evaluate};
use hcl::{Block, Body, Structure, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::channels::ChannelKind;
use crate::config::schema::{Config, Defaults, Target, VaultSettings};

/// Error raised while reading or parsing the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Syntax(#[from] hcl::Error),

    #[error("missing required block {0:?}")]
    MissingBlock(&'static str),

    #[error("duplicate {0:?} block, only one is allowed")]
    DuplicateBlock(&'static str),

    #[error("unsupported block type {name:?} in {context}")]
    UnsupportedBlock { context: String, name: String },

    #[error("unsupported argument {name:?} in {context}")]
    UnsupportedArgument { context: String, name: String },

    #[error("duplicate argument {name:?} in {context}")]
    DuplicateArgument { context: String, name: String },

    #[error("missing required argument {name:?} in {context}")]
    MissingArgument { context: String, name: &'static str },

    #[error("{context} block expects {expected} label(s), found {found}")]
    Labels {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid value for {name:?} in {context}: {reason}")]
    InvalidValue {
        context: String,
        name: String,
        reason: String,
    },

    #[error("duplicate recipient {recipient:?} in {block} blocks")]
    DuplicateRecipient {
        block: &'static str,
        recipient: String,
    },
}

/// Load configuration from a user-supplied path (`~` and `$VARS` expanded)
///
/// A path that does not expand, such as one with a literal `$` or an unset
/// variable, is used as written.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let expanded = shellexpand::full(path).unwrap_or(Cow::Borrowed(path));
    load_config_from_path(Path::new(expanded.as_ref()))
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse configuration text
pub fn parse_config(input: &str) -> Result<Config, ConfigError> {
    let body: Body = hcl::parse(input)?;

    let mut config = Config::default();
    let mut vault = None;
    let mut defaults = None;

    for structure in body.iter() {
        let block = match structure {
            Structure::Block(block) => block,
            Structure::Attribute(attr) => {
                return Err(ConfigError::UnsupportedArgument {
                    context: "configuration root".to_string(),
                    name: attr.key().to_string(),
                })
            }
        };

        match block.identifier() {
            "vault" => {
                if vault.is_some() {
                    return Err(ConfigError::DuplicateBlock("vault"));
                }
                vault = Some(parse_vault(block)?);
            }
            "defaults" => {
                if defaults.is_some() {
                    return Err(ConfigError::DuplicateBlock("defaults"));
                }
                defaults = Some(parse_defaults(block)?);
            }
            other => {
                let kind = ChannelKind::from_block_name(other).ok_or_else(|| {
                    ConfigError::UnsupportedBlock {
                        context: "configuration root".to_string(),
                        name: other.to_string(),
                    }
                })?;
                let target = parse_target(kind, block)?;
                let targets = config.targets_mut(kind);
                if targets.iter().any(|t| t.recipient == target.recipient) {
                    return Err(ConfigError::DuplicateRecipient {
                        block: kind.block_name(),
                        recipient: target.recipient,
                    });
                }
                targets.push(target);
            }
        }
    }

    config.vault = vault.ok_or(ConfigError::MissingBlock("vault"))?;
    config.defaults = defaults.unwrap_or_default();
    Ok(config)
}

fn parse_vault(block: &Block) -> Result<VaultSettings, ConfigError> {
    expect_labels(block, "vault", 0)?;
    let mut attrs = BlockAttributes::read("vault", block.body(), &["address", "mount_path"])?;

    Ok(VaultSettings {
        address: attrs.optional("address"),
        mount_path: attrs.required("mount_path")?,
    })
}

fn parse_defaults(block: &Block) -> Result<Defaults, ConfigError> {
    expect_labels(block, "defaults", 0)?;
    let mut attrs = BlockAttributes::read("defaults", block.body(), &["message"])?;

    Ok(Defaults {
        message: attrs.optional("message"),
    })
}

fn parse_target(kind: ChannelKind, block: &Block) -> Result<Target, ConfigError> {
    expect_labels(block, kind.block_name(), 1)?;
    let recipient = block.labels()[0].as_str().to_string();
    let context = format!("{}.{:?}", kind.block_name(), recipient);

    let destination_attr = kind.destination_attr();
    let mut attrs = BlockAttributes::read(&context, block.body(), &[destination_attr, "message"])?;

    Ok(Target {
        destination: attrs.required(destination_attr)?,
        message: attrs.optional("message"),
        recipient,
    })
}

fn expect_labels(block: &Block, context: &str, expected: usize) -> Result<(), ConfigError> {
    let found = block.labels().len();
    if found != expected {
        return Err(ConfigError::Labels {
            context: context.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Evaluated string attributes of one block
struct BlockAttributes {
    context: String,
    values: HashMap<String, String>,
}

impl BlockAttributes {
    fn read(context: &str, body: &Body, allowed: &[&str]) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();

        for structure in body.iter() {
            let attr = match structure {
                Structure::Attribute(attr) => attr,
                Structure::Block(block) => {
                    return Err(ConfigError::UnsupportedBlock {
                        context: context.to_string(),
                        name: block.identifier().to_string(),
                    })
                }
            };

            let name = attr.key();
            if !allowed.contains(&name) {
                return Err(ConfigError::UnsupportedArgument {
                    context: context.to_string(),
                    name: name.to_string(),
                });
            }

            let value = attr
                .expr()
                .evaluate(&Context::new())
                .map_err(|e| ConfigError::InvalidValue {
                    context: context.to_string(),
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            let value = value_to_string(value).ok_or_else(|| ConfigError::InvalidValue {
                context: context.to_string(),
                name: name.to_string(),
                reason: "expected a string".to_string(),
            })?;

            if values.insert(name.to_string(), value).is_some() {
                return Err(ConfigError::DuplicateArgument {
                    context: context.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            context: context.to_string(),
            values,
        })
    }

    fn required(&mut self, name: &'static str) -> Result<String, ConfigError> {
        self.values
            .remove(name)
            .ok_or_else(|| ConfigError::MissingArgument {
                context: self.context.clone(),
                name,
            })
    }

    fn optional(&mut self, name: &str) -> String {
        self.values.remove(name).unwrap_or_default()
    }
}

/// Strings pass through; numbers and bools use their literal form
fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
