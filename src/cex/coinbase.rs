use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::{QuoteClient, RestVenue, parse_price};
use crate::errors::Result;
use crate::models::{ExchangeId, Quote, Symbol};

pub const COINBASE_REST_ENDPOINT: &str = "https://api.exchange.coinbase.com";

#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    trading_disabled: bool,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    #[serde(default)]
    bid: String,
    #[serde(default)]
    ask: String,
    time: Option<DateTime<Utc>>,
}

/// Coinbase Exchange public REST API.
pub struct Coinbase {
    venue: RestVenue,
}

impl Coinbase {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            venue: RestVenue::new("Coinbase", http, base_url)?,
        })
    }
}

#[async_trait]
impl QuoteClient for Coinbase {
    fn id(&self) -> &ExchangeId {
        self.venue.id()
    }

    async fn load_markets(&self) -> Result<()> {
        let products: Vec<Product> = self.venue.get_json(self.venue.url("/products")?).await?;
        self.venue.set_markets(markets_from(products));
        info!(markets = self.venue.markets_loaded(), "[CEX] Coinbase markets loaded");
        Ok(())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Quote> {
        let market = self.venue.market_id(symbol, |b, q| format!("{b}-{q}"))?;
        let url = self.venue.url(&format!("/products/{market}/ticker"))?;
        let ticker: Ticker = self.venue.get_json(url).await?;
        Ok(quote_from(self.venue.id().clone(), symbol.clone(), ticker))
    }

    async fn close(&self) -> Result<()> {
        self.venue.close();
        Ok(())
    }
}

fn markets_from(products: Vec<Product>) -> HashMap<Symbol, String> {
    products
        .into_iter()
        .filter(|p| !p.trading_disabled)
        .map(|p| {
            let key = Symbol::new(format!("{}/{}", p.base_currency, p.quote_currency));
            (key, p.id)
        })
        .collect()
}

fn quote_from(exchange: ExchangeId, symbol: Symbol, ticker: Ticker) -> Quote {
    Quote::new(
        exchange,
        symbol,
        parse_price(&ticker.bid),
        parse_price(&ticker.ask),
        ticker.time.unwrap_or_else(Utc::now),
    )
}
