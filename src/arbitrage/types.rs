use chrono::{DateTime, Utc};

use crate::models::{ExchangeId, Symbol};

/// Configuration for arbitrage calculations
#[derive(Debug, Clone, Copy)]
pub struct ArbitrageConfig {
    /// Fee charged on each leg, as a fraction of notional.
    pub fee_rate: f64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self { fee_rate: 0.001 }
    }
}

/// Best buy/sell pairing for one symbol at one instant, net of fees.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunitySummary {
    pub symbol: Symbol,
    pub buy_exchange: ExchangeId,
    pub buy_price: f64,
    pub sell_exchange: ExchangeId,
    pub sell_price: f64,
    /// Net profit per unit after both legs' fees.
    pub profit_absolute: f64,
    pub profit_percent: f64,
    pub computed_at: DateTime<Utc>,
}

/// Outcome of evaluating one symbol's quotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No exchange returned a quote this tick.
    NoDataAvailable(Symbol),
    Opportunity(OpportunitySummary),
    /// Best spread found is not profitable after fees.
    NoOpportunity(OpportunitySummary),
}

impl Detection {
    pub fn summary(&self) -> Option<&OpportunitySummary> {
        match self {
            Detection::NoDataAvailable(_) => None,
            Detection::Opportunity(s) | Detection::NoOpportunity(s) => Some(s),
        }
    }

    pub fn is_opportunity(&self) -> bool {
        matches!(self, Detection::Opportunity(_))
    }
}
