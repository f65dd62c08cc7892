//! CLI entry point for babybutton
//!
//! Reads the configuration file named on the command line, validates it
//! and sends every configured message once. Per-recipient failures are
//! logged and do not change the exit status.

use babybutton::{init_logging, ChannelOutcome, NotificationError, Notifier};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

/// Command-line arguments for babybutton
#[derive(Parser, Debug)]
#[command(
    name = "babybutton",
    version,
    about = "Send one message to every recipient in a config file",
    long_about = "Send one message to every recipient listed in an HCL config file, across Slack, \
Twilio SMS, Matrix and Discord. Credentials are read from Vault at {mount_path}/data/{slack,twilio,matrix,discord}.

Environment:
  VAULT_TOKEN  Vault token (required)
  VAULT_ADDR   Vault address when vault.address is not set in the config
  RUST_LOG     Log filter, overrides --debug"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(value_name = "CONFIG")]
    config: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let notifier = match Notifier::from_file(&cli.config) {
        Ok(notifier) => notifier,
        Err(NotificationError::Config(e)) => {
            error!("Error parsing config file {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
        Err(NotificationError::Validation(e)) => {
            error!("Invalid config file {}: {}", cli.config, e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match notifier.send_all() {
        Ok(reports) => {
            for report in reports {
                if let ChannelOutcome::Delivered { sent, failed } = report.outcome {
                    debug!(channel = %report.kind, sent = sent.len(), failed = failed.len(), "Channel summary");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
