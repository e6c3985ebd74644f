use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::{QuoteClient, RestVenue, parse_price};
use crate::errors::Result;
use crate::models::{ExchangeId, Quote, Symbol};

pub const BINANCE_REST_ENDPOINT: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTicker {
    #[serde(rename = "symbol")]
    _symbol: String,
    bid_price: String,
    ask_price: String,
}

/// Binance spot public REST API.
pub struct Binance {
    venue: RestVenue,
}

impl Binance {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            venue: RestVenue::new("Binance", http, base_url)?,
        })
    }
}

#[async_trait]
impl QuoteClient for Binance {
    fn id(&self) -> &ExchangeId {
        self.venue.id()
    }

    async fn load_markets(&self) -> Result<()> {
        let info: ExchangeInfo = self
            .venue
            .get_json(self.venue.url("/api/v3/exchangeInfo")?)
            .await?;
        self.venue.set_markets(markets_from(info));
        info!(markets = self.venue.markets_loaded(), "[CEX] Binance markets loaded");
        Ok(())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Quote> {
        let market = self.venue.market_id(symbol, |b, q| format!("{b}{q}"))?;
        let mut url = self.venue.url("/api/v3/ticker/bookTicker")?;
        url.query_pairs_mut().append_pair("symbol", &market);
        let ticker: BookTicker = self.venue.get_json(url).await?;
        Ok(quote_from(self.venue.id().clone(), symbol.clone(), &ticker))
    }

    async fn close(&self) -> Result<()> {
        self.venue.close();
        Ok(())
    }
}

fn markets_from(info: ExchangeInfo) -> HashMap<Symbol, String> {
    info.symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| {
            let key = Symbol::new(format!("{}/{}", s.base_asset, s.quote_asset));
            (key, s.symbol)
        })
        .collect()
}

fn quote_from(exchange: ExchangeId, symbol: Symbol, ticker: &BookTicker) -> Quote {
    // bookTicker carries no timestamp; the observation time is ours.
    Quote::new(
        exchange,
        symbol,
        parse_price(&ticker.bid_price),
        parse_price(&ticker.ask_price),
        Utc::now(),
    )
}
