//! Shared data structures used throughout the application.

use chrono::{DateTime, Utc};
use std::fmt;

/// Trading pair identifier in `BASE/QUOTE` form, e.g. "ETH/USDT".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits into `(base, quote)`; `None` when the separator is missing.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (base, quote) = self.0.split_once('/')?;
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some((base, quote))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Display name of an exchange, e.g. "Binance".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExchangeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Best bid/ask snapshot for one symbol on one exchange.
///
/// A side the venue did not report is stored as `0.0` (bid) or
/// `f64::INFINITY` (ask) so it never wins the best-price selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        exchange: ExchangeId,
        symbol: Symbol,
        bid: Option<f64>,
        ask: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange,
            symbol,
            bid: bid.unwrap_or(0.0),
            ask: ask.unwrap_or(f64::INFINITY),
            timestamp,
        }
    }
}
