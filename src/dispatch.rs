//! Channel dispatch
//!
//! One routine drives every channel: resolve credentials, connect, then
//! walk the target list in order. Failures never escape a channel, and a
//! failed target never stops the next one.

use tracing::{debug, error, info};

use crate::channels::{ChannelKind, Connector};
use crate::config::Config;
use crate::emoji;
use crate::secrets::{SecretResolver, SecretStore};

/// What happened to one channel during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// No targets configured; nothing was fetched or sent
    Skipped,
    /// Credentials or client construction failed; no target was attempted
    Aborted(String),
    /// Targets were attempted; recipient labels by result
    Delivered { sent: Vec<String>, failed: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub kind: ChannelKind,
    pub outcome: ChannelOutcome,
}

impl ChannelReport {
    fn new(kind: ChannelKind, outcome: ChannelOutcome) -> Self {
        Self { kind, outcome }
    }
}

/// Send every configured message, one channel after another
pub async fn dispatch_all<S, C>(
    config: &Config,
    resolver: &SecretResolver<S>,
    connector: &C,
) -> Vec<ChannelReport>
where
    S: SecretStore,
    C: Connector + ?Sized,
{
    let mut reports = Vec::with_capacity(ChannelKind::ALL.len());
    for kind in ChannelKind::ALL {
        reports.push(dispatch_channel(kind, config, resolver, connector).await);
    }
    reports
}

/// Send the configured messages of a single channel
pub async fn dispatch_channel<S, C>(
    kind: ChannelKind,
    config: &Config,
    resolver: &SecretResolver<S>,
    connector: &C,
) -> ChannelReport
where
    S: SecretStore,
    C: Connector + ?Sized,
{
    let targets = config.targets(kind);
    if targets.is_empty() {
        debug!(channel = %kind, "No targets configured, skipping");
        return ChannelReport::new(kind, ChannelOutcome::Skipped);
    }

    let credentials = match resolver.resolve(kind).await {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(channel = %kind, "Error retrieving {} credentials from Vault: {}", kind.provider(), e);
            return ChannelReport::new(kind, ChannelOutcome::Aborted(e.to_string()));
        }
    };

    debug!(channel = %kind, source = credentials.source(), "Credentials resolved");

    let connected = connector.connect(kind, &credentials).await;
    drop(credentials);
    let mut messenger = match connected {
        Ok(messenger) => messenger,
        Err(e) => {
            error!(channel = %kind, "Error creating {} client: {}", kind.provider(), e);
            return ChannelReport::new(kind, ChannelOutcome::Aborted(e.to_string()));
        }
    };

    let mut sent = Vec::new();
    let mut failed = Vec::new();

    for target in targets {
        if let Err(e) = messenger.prepare(&target.destination).await {
            debug!(channel = %kind, recipient = %target.recipient, "Skipping {}: {}", target.recipient, e);
            failed.push(target.recipient.clone());
            continue;
        }

        let text = emoji::parse(config.effective_message(target));
        match messenger.send(&target.destination, &text).await {
            Ok(()) => {
                info!(channel = %kind, recipient = %target.recipient, "Sent {} to {}.", kind.noun(), target.recipient);
                sent.push(target.recipient.clone());
            }
            Err(e) => {
                error!(channel = %kind, recipient = %target.recipient, "Error sending {} to {}: {}", kind.noun(), target.recipient, e);
                failed.push(target.recipient.clone());
            }
        }
    }

    debug!(channel = %kind, sent = sent.len(), failed = failed.len(), "Channel finished");
    ChannelReport::new(kind, ChannelOutcome::Delivered { sent, failed })
}
