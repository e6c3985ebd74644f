use anyhow::Result;
use cex_arbitrage_scanner::{
    cex,
    config::AppConfig,
    lifecycle::{self, Lifecycle},
    notifier::{LogNotifier, Notifier, RetryPolicy, TelegramNotifier},
    scanner::ScannerConfig,
    utils,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        exchanges = ?config.exchanges,
        symbols = ?config.symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        trading_fee = config.trading_fee,
        poll_interval_secs = config.poll_interval.as_secs(),
        "[INIT] cex-arbitrage-scanner starting"
    );

    let http = cex::http_client(config.request_timeout)?;
    let clients = config
        .exchanges
        .iter()
        .map(|key| cex::connect(key, http.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => {
            let policy = RetryPolicy::new(config.notify_max_retries, config.notify_initial_delay);
            Arc::new(TelegramNotifier::new(http.clone(), telegram, policy)?)
        }
        None => {
            tracing::warn!(
                "[INIT] TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, alerts go to the log only"
            );
            Arc::new(LogNotifier)
        }
    };

    let signals = lifecycle::os_signals()?;
    let lifecycle = Lifecycle::new(
        clients,
        config.symbols.clone(),
        notifier,
        ScannerConfig::from(&config),
    )
    .with_close_timeout(config.request_timeout);

    let ticks = lifecycle.run_with_signals(signals).await?;
    tracing::info!(ticks, "[EXIT] program exited");
    Ok(())
}
