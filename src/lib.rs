pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::providers::ExchangeRateApiProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum AppCommand {
    Convert {
        amount: f64,
        from: Option<String>,
        to: Option<String>,
    },
    Rates {
        base: Option<String>,
    },
    Interactive,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        from = %config.defaults.from,
        to = %config.defaults.to,
        "Loaded config"
    );

    let provider =
        ExchangeRateApiProvider::new(&config.provider.base_url, &config.provider.api_key);

    match command {
        AppCommand::Convert { amount, from, to } => {
            let from = from.unwrap_or(config.defaults.from);
            let to = to.unwrap_or(config.defaults.to);
            cli::convert::run(&provider, amount, &from, &to).await
        }
        AppCommand::Rates { base } => {
            let base = base.unwrap_or(config.defaults.from);
            cli::rates::run(&provider, &base).await
        }
        AppCommand::Interactive => {
            cli::interactive::run(
                Arc::new(provider),
                &config.defaults.from,
                &config.defaults.to,
            )
            .await
        }
    }
}
