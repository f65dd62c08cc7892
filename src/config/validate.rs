//! Cross-field configuration rules
//!
//! Validation is fail-fast: the first broken rule is reported and nothing
//! is sent for any channel.

use thiserror::Error;

use crate::channels::ChannelKind;
use crate::config::schema::Config;

/// A configuration that parsed but cannot be dispatched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("vault.mount_path must be set")]
    MissingMountPath,

    #[error("{block}.{recipient:?}.message must be set because defaults.message is not set")]
    MissingMessage {
        block: &'static str,
        recipient: String,
    },
}

impl Config {
    /// Check the rules that the parser alone cannot express
    ///
    /// When `defaults.message` is empty every target must carry its own
    /// message. Channels are checked in dispatch order, targets in list order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.vault.mount_path().is_empty() {
            return Err(ValidationError::MissingMountPath);
        }

        if !self.defaults.message.is_empty() {
            return Ok(());
        }

        for kind in ChannelKind::ALL {
            if let Some(target) = self.targets(kind).iter().find(|t| t.message.is_empty()) {
                return Err(ValidationError::MissingMessage {
                    block: kind.block_name(),
                    recipient: target.recipient.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Defaults, Target, VaultSettings};

    fn base_config() -> Config {
        Config {
            vault: VaultSettings {
                address: String::new(),
                mount_path: "secret".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_mount_path_required() {
        let mut config = base_config();
        config.vault.mount_path = String::new();
        assert_eq!(config.validate(), Err(ValidationError::MissingMountPath));

        config.vault.mount_path = "/".to_string();
        assert_eq!(config.validate(), Err(ValidationError::MissingMountPath));
    }

    #[test]
    fn test_mount_path_checked_even_with_default_message() {
        let mut config = base_config();
        config.vault.mount_path = String::new();
        config.defaults = Defaults {
            message: "hi".to_string(),
        };
        assert_eq!(config.validate(), Err(ValidationError::MissingMountPath));
    }

    #[test]
    fn test_default_message_covers_every_target() {
        let mut config = base_config();
        config.defaults.message = "hi".to_string();
        config.slack = vec![Target::new("a", "C1", "")];
        config.sms = vec![Target::new("b", "+1", "")];
        config.matrix = vec![Target::new("c", "!r:x", "")];
        config.discord = vec![Target::new("d", "1", "")];

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_lists_are_valid_without_default() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_missing_message_names_recipient() {
        let mut config = base_config();
        config.sms = vec![Target::new("grandma", "+15550100", "")];

        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingMessage {
                block: "sms",
                recipient: "grandma".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "sms.\"grandma\".message must be set because defaults.message is not set"
        );
    }

    #[test]
    fn test_first_failure_in_channel_order() {
        let mut config = base_config();
        config.discord = vec![Target::new("d", "1", "")];
        config.matrix = vec![Target::new("m", "!r:x", "")];
        config.slack = vec![
            Target::new("s1", "C1", "hello"),
            Target::new("s2", "C2", ""),
            Target::new("s3", "C3", ""),
        ];

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingMessage {
                block: "slack_message",
                recipient: "s2".to_string(),
            })
        );
    }

    #[test]
    fn test_discord_checked_against_its_own_targets() {
        let mut config = base_config();
        config.slack = vec![Target::new("s", "C1", "hello")];
        config.discord = vec![Target::new("d", "1", "")];

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingMessage {
                block: "discord_message",
                recipient: "d".to_string(),
            })
        );

        // a Slack target without a message must not be reported as Discord
        let mut config = base_config();
        config.slack = vec![Target::new("s", "C1", "")];
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingMessage {
                block: "slack_message",
                recipient: "s".to_string(),
            })
        );
    }
}
