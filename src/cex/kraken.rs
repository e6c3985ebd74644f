use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::{QuoteClient, RestVenue, parse_price};
use crate::errors::{AppError, Result};
use crate::models::{ExchangeId, Quote, Symbol};

pub const KRAKEN_REST_ENDPOINT: &str = "https://api.kraken.com";

/// Kraken wraps every payload as `{"error": [...], "result": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AssetPair {
    /// e.g. "ETH/USDT"; absent on dark-pool pairs.
    wsname: Option<String>,
}

/// Ticker entry; `a` and `b` are `[price, whole lot volume, lot volume]`.
#[derive(Debug, Deserialize)]
struct TickerEntry {
    a: Vec<String>,
    b: Vec<String>,
}

/// Kraken spot public REST API.
pub struct Kraken {
    venue: RestVenue,
}

impl Kraken {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            venue: RestVenue::new("Kraken", http, base_url)?,
        })
    }
}

#[async_trait]
impl QuoteClient for Kraken {
    fn id(&self) -> &ExchangeId {
        self.venue.id()
    }

    async fn load_markets(&self) -> Result<()> {
        let env: Envelope<HashMap<String, AssetPair>> = self
            .venue
            .get_json(self.venue.url("/0/public/AssetPairs")?)
            .await?;
        let pairs = unwrap_envelope(self.venue.id(), env)?;
        self.venue.set_markets(markets_from(pairs));
        info!(markets = self.venue.markets_loaded(), "[CEX] Kraken markets loaded");
        Ok(())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Quote> {
        let market = self.venue.market_id(symbol, |b, q| format!("{b}{q}"))?;
        let mut url = self.venue.url("/0/public/Ticker")?;
        url.query_pairs_mut().append_pair("pair", &market);
        let env: Envelope<HashMap<String, TickerEntry>> = self.venue.get_json(url).await?;
        let entries = unwrap_envelope(self.venue.id(), env)?;
        quote_from(self.venue.id().clone(), symbol.clone(), entries)
    }

    async fn close(&self) -> Result<()> {
        self.venue.close();
        Ok(())
    }
}

fn unwrap_envelope<T>(exchange: &ExchangeId, env: Envelope<T>) -> Result<T> {
    if !env.error.is_empty() {
        return Err(AppError::exchange(exchange.as_str(), env.error.join("; ")));
    }
    env.result
        .ok_or_else(|| AppError::exchange(exchange.as_str(), "response has no result"))
}

fn markets_from(pairs: HashMap<String, AssetPair>) -> HashMap<Symbol, String> {
    pairs
        .into_iter()
        .filter_map(|(key, pair)| Some((common_symbol(&pair.wsname?), key)))
        .collect()
}

/// Kraken's wsname still uses legacy asset codes for a few coins.
fn common_symbol(wsname: &str) -> Symbol {
    match wsname.split_once('/') {
        Some((base, quote)) => Symbol::new(format!("{}/{}", common_asset(base), common_asset(quote))),
        None => Symbol::new(wsname),
    }
}

fn common_asset(code: &str) -> &str {
    match code {
        "XBT" => "BTC",
        "XDG" => "DOGE",
        other => other,
    }
}

fn quote_from(
    exchange: ExchangeId,
    symbol: Symbol,
    entries: HashMap<String, TickerEntry>,
) -> Result<Quote> {
    // One pair requested, so at most one entry comes back.
    let entry = entries
        .into_values()
        .next()
        .ok_or_else(|| AppError::fetch(exchange.as_str(), symbol.as_str(), "empty ticker result"))?;
    let bid = entry.b.first().and_then(|p| parse_price(p));
    let ask = entry.a.first().and_then(|p| parse_price(p));
    Ok(Quote::new(exchange, symbol, bid, ask, Utc::now()))
}
