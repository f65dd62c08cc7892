//! Configuration schema for babybutton
//!
//! Typed records for the declarative configuration: secret-store settings,
//! the shared default message and one target list per channel.

use crate::channels::ChannelKind;

/// Root configuration, read-only once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Secret store connection settings
    pub vault: VaultSettings,

    /// Shared defaults applied to every target
    pub defaults: Defaults,

    /// `slack_message` blocks
    pub slack: Vec<Target>,

    /// `sms` blocks
    pub sms: Vec<Target>,

    /// `matrix_message` blocks
    pub matrix: Vec<Target>,

    /// `discord_message` blocks
    pub discord: Vec<Target>,
}

impl Config {
    /// Target list for one channel, in configuration order
    pub fn targets(&self, kind: ChannelKind) -> &[Target] {
        match kind {
            ChannelKind::Slack => &self.slack,
            ChannelKind::Sms => &self.sms,
            ChannelKind::Matrix => &self.matrix,
            ChannelKind::Discord => &self.discord,
        }
    }

    pub(crate) fn targets_mut(&mut self, kind: ChannelKind) -> &mut Vec<Target> {
        match kind {
            ChannelKind::Slack => &mut self.slack,
            ChannelKind::Sms => &mut self.sms,
            ChannelKind::Matrix => &mut self.matrix,
            ChannelKind::Discord => &mut self.discord,
        }
    }

    /// Message actually sent to a target: its own override, else the default
    pub fn effective_message<'a>(&'a self, target: &'a Target) -> &'a str {
        if target.message.is_empty() {
            &self.defaults.message
        } else {
            &target.message
        }
    }
}

/// `vault { ... }` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultSettings {
    /// Secret store URL; empty means `VAULT_ADDR` or the store default
    pub address: String,

    /// Path prefix under which channel secrets live
    pub mount_path: String,
}

impl VaultSettings {
    /// Mount path with leading and trailing slashes removed
    pub fn mount_path(&self) -> &str {
        self.mount_path.trim_matches('/')
    }
}

/// `defaults { ... }` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub message: String,
}

/// One recipient of one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Block label; only used in log lines
    pub recipient: String,

    /// Channel ID, phone number or room ID depending on the channel
    pub destination: String,

    /// Per-target override of the default message
    pub message: String,
}

impl Target {
    pub fn new(recipient: &str, destination: &str, message: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            destination: destination.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_path_is_trimmed() {
        let vault = VaultSettings {
            address: String::new(),
            mount_path: "/kv/notify/".to_string(),
        };
        assert_eq!(vault.mount_path(), "kv/notify");

        let vault = VaultSettings {
            address: String::new(),
            mount_path: "//".to_string(),
        };
        assert_eq!(vault.mount_path(), "");
    }

    #[test]
    fn test_effective_message() {
        let config = Config {
            defaults: Defaults {
                message: "hi".to_string(),
            },
            ..Default::default()
        };

        let with_override = Target::new("alice", "C1", "bye");
        let without_override = Target::new("bob", "C2", "");

        assert_eq!(config.effective_message(&with_override), "bye");
        assert_eq!(config.effective_message(&without_override), "hi");
    }

    #[test]
    fn test_targets_by_kind() {
        let config = Config {
            sms: vec![Target::new("carol", "+15550100", "")],
            ..Default::default()
        };

        assert_eq!(config.targets(ChannelKind::Sms).len(), 1);
        assert!(config.targets(ChannelKind::Slack).is_empty());
        assert!(config.targets(ChannelKind::Matrix).is_empty());
        assert!(config.targets(ChannelKind::Discord).is_empty());
    }
}
