//! Messaging channel trait definitions
//!
//! Every provider is reduced to one capability: deliver a text to a
//! destination. `Connector` turns a credential bundle into such a client.

use async_trait::async_trait;

use crate::channels::ChannelKind;
use crate::error::ChannelResult;
use crate::secrets::Credentials;

/// A connected provider client
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Hook run before each send; a failure skips only that target
    ///
    /// Default implementation does nothing.
    async fn prepare(&mut self, _destination: &str) -> ChannelResult<()> {
        Ok(())
    }

    /// Deliver one message
    async fn send(&self, destination: &str, text: &str) -> ChannelResult<()>;
}

/// Builds a provider client for a channel from its credentials
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        kind: ChannelKind,
        credentials: &Credentials,
    ) -> ChannelResult<Box<dyn Messenger>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMessenger;

    #[async_trait]
    impl Messenger for MockMessenger {
        async fn send(&self, _destination: &str, _text: &str) -> ChannelResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_prepare_is_noop() {
        let mut messenger = MockMessenger;
        assert!(messenger.prepare("anywhere").await.is_ok());
        assert!(messenger.send("anywhere", "hi").await.is_ok());
    }
}
