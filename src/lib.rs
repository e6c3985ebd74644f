//! Cross-exchange arbitrage scanner.
//!
//! Polls best bid/ask quotes from several centralized exchanges, flags
//! spreads that stay profitable after fees, and pushes alerts to Telegram.

pub mod arbitrage;
pub mod cex;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod notifier;
pub mod scanner;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
