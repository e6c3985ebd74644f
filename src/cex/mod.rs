//! CEX REST ticker clients.
//!
//! Responsibilities:
//! • Load each venue's instrument list once at startup.
//! • Fetch the current best bid / ask for a `BASE/QUOTE` symbol.
//! • Report every failure as a value; nothing here panics on bad data.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::errors::{AppError, Result};
use crate::models::{ExchangeId, Quote, Symbol};

pub mod binance;
pub mod coinbase;
pub mod kraken;

pub use binance::Binance;
pub use coinbase::Coinbase;
pub use kraken::Kraken;

/// Narrow interface the scanner and lifecycle consume.
#[async_trait]
pub trait QuoteClient: Send + Sync {
    fn id(&self) -> &ExchangeId;

    /// One-time warm-up; records which symbols the venue lists.
    async fn load_markets(&self) -> Result<()>;

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Quote>;

    async fn close(&self) -> Result<()>;
}

/// Shared HTTP client for all venues.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cex-arbitrage-scanner/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Build the client for a configured exchange key (`binance`, `kraken`, `coinbase`).
pub fn connect(key: &str, http: reqwest::Client) -> Result<Arc<dyn QuoteClient>> {
    let client: Arc<dyn QuoteClient> = match key {
        "binance" => Arc::new(Binance::new(http, binance::BINANCE_REST_ENDPOINT)?),
        "kraken" => Arc::new(Kraken::new(http, kraken::KRAKEN_REST_ENDPOINT)?),
        "coinbase" => Arc::new(Coinbase::new(http, coinbase::COINBASE_REST_ENDPOINT)?),
        other => {
            return Err(AppError::Config(format!(
                "unsupported exchange {other:?} (expected binance, kraken or coinbase)"
            )));
        }
    };
    Ok(client)
}

/// State common to every REST venue: HTTP client, base URL, the market map
/// filled by `load_markets`, and the closed flag.
pub(crate) struct RestVenue {
    id: ExchangeId,
    http: reqwest::Client,
    base: Url,
    markets: OnceLock<HashMap<Symbol, String>>,
    closed: AtomicBool,
}

impl RestVenue {
    pub(crate) fn new(name: &str, http: reqwest::Client, base: &str) -> Result<Self> {
        Ok(Self {
            id: ExchangeId::new(name),
            http,
            base: Url::parse(base)?,
            markets: OnceLock::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> &ExchangeId {
        &self.id
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// GET a JSON document, turning non-2xx statuses into exchange errors.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(exchange = %self.id, %url, "[CEX] GET");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::exchange(
                self.id.as_str(),
                format!("HTTP {status}: {}", truncate(&body, 200)),
            ));
        }
        Ok(resp.json().await?)
    }

    pub(crate) fn set_markets(&self, markets: HashMap<Symbol, String>) {
        // A second warm-up keeps the first map.
        let _ = self.markets.set(markets);
    }

    pub(crate) fn markets_loaded(&self) -> usize {
        self.markets.get().map_or(0, HashMap::len)
    }

    /// Resolve the venue-native id for `symbol`, or fail the fetch.
    ///
    /// Before markets are loaded, `fallback` derives the id from the symbol.
    pub(crate) fn market_id<F>(&self, symbol: &Symbol, fallback: F) -> Result<String>
    where
        F: FnOnce(&str, &str) -> String,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::fetch(self.id.as_str(), symbol.as_str(), "client is closed"));
        }
        match self.markets.get() {
            Some(markets) => markets.get(symbol).cloned().ok_or_else(|| {
                AppError::fetch(self.id.as_str(), symbol.as_str(), "symbol not listed")
            }),
            None => {
                let (base, quote) = symbol.split().ok_or_else(|| {
                    AppError::fetch(self.id.as_str(), symbol.as_str(), "malformed symbol")
                })?;
                Ok(fallback(base, quote))
            }
        }
    }

    /// Marks the venue closed; returns `false` when it already was.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

/// Parse a decimal price string; empty, zero or garbage values count as missing.
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_rejects_missing_values() {
        assert_eq!(parse_price("101.25"), Some(101.25));
        assert_eq!(parse_price(" 7 "), Some(7.0));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("0.00000000"), None);
        assert_eq!(parse_price("bad"), None);
    }

    #[test]
    fn unknown_exchange_is_a_config_error() {
        let http = reqwest::Client::new();
        assert!(matches!(connect("ftx", http.clone()), Err(AppError::Config(_))));
        let client = connect("kraken", http).unwrap();
        assert_eq!(client.id().as_str(), "Kraken");
    }

    #[test]
    fn market_lookup_uses_loaded_map_then_fallback() {
        let venue = RestVenue::new("Test", reqwest::Client::new(), "https://example.com").unwrap();
        let sym = Symbol::from("ETH/USDT");
        assert_eq!(venue.market_id(&sym, |b, q| format!("{b}{q}")).unwrap(), "ETHUSDT");

        venue.set_markets(HashMap::from([(sym.clone(), "XETHZUSDT".to_string())]));
        assert_eq!(venue.market_id(&sym, |b, q| format!("{b}{q}")).unwrap(), "XETHZUSDT");
        let missing = venue.market_id(&Symbol::from("SOL/DAI"), |b, q| format!("{b}{q}"));
        assert!(matches!(missing, Err(AppError::Fetch { .. })));
    }

    #[test]
    fn closed_venue_refuses_fetches() {
        let venue = RestVenue::new("Test", reqwest::Client::new(), "https://example.com").unwrap();
        assert!(venue.close());
        assert!(!venue.close());
        let res = venue.market_id(&Symbol::from("ETH/USDT"), |b, q| format!("{b}{q}"));
        assert!(matches!(res, Err(AppError::Fetch { .. })));
    }
}
