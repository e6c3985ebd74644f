//! Configuration loader and application settings.
//!
//! Every setting comes from the environment (a `.env` file is loaded by the
//! binary first) and has a default, except the Telegram credentials.

use crate::errors::{AppError, Result};
use crate::models::Symbol;
use crate::utils::split_list;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_EXCHANGES: &str = "binance,kraken";
pub const DEFAULT_SYMBOLS: &str = "ETH/USDT,ETH/DAI,SOL/USDT,SOL/USDC";
pub const DEFAULT_TRADING_FEE: f64 = 0.001;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_DIGEST_INTERVAL_MINUTES: u32 = 15;
pub const DEFAULT_NOTIFY_MAX_RETRIES: u32 = 3;
pub const DEFAULT_NOTIFY_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram bot credentials.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

// Keeps the bot token out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when either credential is missing; alerts then go to the log only.
    pub telegram: Option<TelegramConfig>,
    /// Lower-case exchange keys, in the order used for tie-breaking.
    pub exchanges: Vec<String>,
    pub symbols: Vec<Symbol>,
    /// Per-leg trading fee as a fraction (0.001 = 0.1%).
    pub trading_fee: f64,
    pub poll_interval: Duration,
    /// Digest boundary in wall-clock minutes; 0 disables digests.
    pub digest_interval_minutes: u32,
    pub notify_max_retries: u32,
    pub notify_initial_delay: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.into()),
            }),
            _ => None,
        };

        let exchanges: Vec<String> =
            split_list(&get("EXCHANGES").unwrap_or_else(|| DEFAULT_EXCHANGES.into()))
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect();
        if exchanges.is_empty() {
            return Err(AppError::Config("EXCHANGES must name at least one exchange".into()));
        }

        let symbols: Vec<Symbol> =
            split_list(&get("SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.into()))
                .into_iter()
                .map(|s| Symbol::new(s.to_uppercase()))
                .collect();
        if symbols.is_empty() {
            return Err(AppError::Config("SYMBOLS must name at least one pair".into()));
        }
        if let Some(bad) = symbols.iter().find(|s| s.split().is_none()) {
            return Err(AppError::Config(format!(
                "symbol {bad} is not in BASE/QUOTE form"
            )));
        }

        let trading_fee: f64 = parse_or(&get, "TRADING_FEE", DEFAULT_TRADING_FEE)?;
        if !(0.0..1.0).contains(&trading_fee) {
            return Err(AppError::Config(format!(
                "TRADING_FEE must be in [0, 1), got {trading_fee}"
            )));
        }

        let poll_secs: u64 = parse_or(&get, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_secs == 0 {
            return Err(AppError::Config("POLL_INTERVAL_SECS must be at least 1".into()));
        }
        let digest_interval_minutes: u32 = parse_or(
            &get,
            "DIGEST_INTERVAL_MINUTES",
            DEFAULT_DIGEST_INTERVAL_MINUTES,
        )?;
        let notify_max_retries: u32 =
            parse_or(&get, "NOTIFY_MAX_RETRIES", DEFAULT_NOTIFY_MAX_RETRIES)?;
        if notify_max_retries == 0 {
            return Err(AppError::Config("NOTIFY_MAX_RETRIES must be at least 1".into()));
        }
        let delay_ms: u64 = parse_or(
            &get,
            "NOTIFY_INITIAL_DELAY_MS",
            DEFAULT_NOTIFY_INITIAL_DELAY_MS,
        )?;
        let timeout_secs: u64 =
            parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(AppError::Config("REQUEST_TIMEOUT_SECS must be at least 1".into()));
        }

        Ok(Self {
            telegram,
            exchanges,
            symbols,
            trading_fee,
            poll_interval: Duration::from_secs(poll_secs),
            digest_interval_minutes,
            notify_max_retries,
            notify_initial_delay: Duration::from_millis(delay_ms),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}
