pub mod cli;
pub mod core;
pub mod providers;

use anyhow::Result;
use tracing::{debug, info};

use crate::core::config::AppConfig;
use crate::providers::OpenExchangeRatesClient;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rates {
        base: Option<String>,
        symbols: Vec<String>,
    },
    Convert {
        from: String,
        to: String,
        amount: f64,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("oxrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        "Loaded config"
    );

    let client = OpenExchangeRatesClient::with_config(config.client_config()?);

    match command {
        AppCommand::Rates { base, symbols } => {
            let base = base.or(config.base).unwrap_or_default().to_uppercase();
            let symbols = if symbols.is_empty() {
                config.symbols
            } else {
                symbols
            };
            cli::rates::fetch_and_display(&client, &base, &symbols).await?;
        }
        AppCommand::Convert { from, to, amount } => {
            cli::convert::convert_and_display(&client, &from, &to, amount).await?;
        }
    }

    Ok(())
}
