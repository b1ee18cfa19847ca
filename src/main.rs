//! NSE option-chain scraper.
//!
//! Usage: `nse-chain [config.toml]`. Without a path the built-in defaults are
//! used.

use anyhow::Context;
use nse_chain::OiScraper;
use nse_chain::config::Config;
use nse_client::NseClient;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => Config::default(),
    };

    // Initialize tracing
    if let Some(path) = nse_chain::logging::init(&config.logging)? {
        info!(path = %path.display(), "Logging to file");
    }

    let client = NseClient::new(config.to_client_config())?;
    let scraper = OiScraper::new(client.clone(), config.scraper.targets())?;
    info!(
        symbols = ?scraper.symbols().collect::<Vec<_>>(),
        interval = ?config.scraper.interval(),
        unlimited_retries = client.retry_policy().is_unlimited(),
        "Starting option-chain scraper"
    );

    let cancel = client.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            cancel.cancel();
        }
    });

    let rounds = scraper.run(config.scraper.interval()).await;
    info!(rounds, "Scraper stopped");
    Ok(())
}
