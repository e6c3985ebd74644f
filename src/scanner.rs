//! Scan loop: fetch quotes for every symbol on every exchange, detect, report.
//!
//! Each tick spawns one task per symbol and, inside it, one task per
//! exchange. All of them are joined before the tick ends, so no task
//! outlives its tick. Per-symbol failures are contained in that symbol's
//! result; only the run state ends the loop.

use chrono::{DateTime, Local, Timelike};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::arbitrage::{ArbitrageConfig, Detection, detect};
use crate::cex::QuoteClient;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::lifecycle::RunState;
use crate::models::{Quote, Symbol};
use crate::notifier::{Notifier, dispatch, format};

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub poll_interval: Duration,
    /// Digest boundary in wall-clock minutes; 0 disables digests.
    pub digest_interval_minutes: u32,
    pub arbitrage: ArbitrageConfig,
}

impl From<&AppConfig> for ScannerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            digest_interval_minutes: config.digest_interval_minutes,
            arbitrage: ArbitrageConfig {
                fee_rate: config.trading_fee,
            },
        }
    }
}

/// Per-tick tally of symbol outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub opportunities: usize,
    pub quiet: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, outcome: &Result<Detection>) {
        match outcome {
            Ok(Detection::Opportunity(_)) => self.opportunities += 1,
            Ok(Detection::NoOpportunity(_)) => self.quiet += 1,
            Ok(Detection::NoDataAvailable(_)) => self.no_data += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Whether a no-opportunity digest is due at `now`.
///
/// Aligned to the wall clock: due during every minute that is a multiple of
/// `interval_minutes`, so every check inside that minute sends one.
pub fn digest_due(now: DateTime<Local>, interval_minutes: u32) -> bool {
    interval_minutes > 0 && now.minute() % interval_minutes == 0
}

struct ScanContext {
    clients: Vec<Arc<dyn QuoteClient>>,
    notifier: Arc<dyn Notifier>,
    config: ScannerConfig,
}

pub struct Scanner {
    ctx: Arc<ScanContext>,
    symbols: Vec<Symbol>,
}

impl Scanner {
    pub fn new(
        clients: Vec<Arc<dyn QuoteClient>>,
        symbols: Vec<Symbol>,
        notifier: Arc<dyn Notifier>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(ScanContext {
                clients,
                notifier,
                config,
            }),
            symbols,
        }
    }

    /// Tick until `run_state` is stopped; returns the number of ticks run.
    pub async fn run(&self, run_state: &RunState) -> u64 {
        let mut ticks: u64 = 0;
        let exchanges: Vec<String> = self.ctx.clients.iter().map(|c| c.id().to_string()).collect();
        info!(
            symbols = self.symbols.len(),
            exchanges = ?exchanges,
            interval_secs = self.ctx.config.poll_interval.as_secs_f64(),
            "[SCAN] loop started"
        );
        while run_state.is_running() {
            let report = self.run_tick().await;
            ticks += 1;
            info!(
                tick = ticks,
                opportunities = report.opportunities,
                quiet = report.quiet,
                no_data = report.no_data,
                failed = report.failed,
                "[SCAN] tick complete"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.ctx.config.poll_interval) => {}
                _ = run_state.stopped() => {}
            }
        }
        info!(ticks, "[SCAN] loop stopped");
        ticks
    }

    /// One pass over every symbol, all concurrently.
    pub async fn run_tick(&self) -> TickReport {
        let handles: Vec<_> = self
            .symbols
            .iter()
            .map(|symbol| {
                let ctx = self.ctx.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move { ctx.scan_symbol(&symbol).await })
            })
            .collect();

        let mut report = TickReport::default();
        for (symbol, joined) in self.symbols.iter().zip(join_all(handles).await) {
            let outcome = joined.map_err(|e| AppError::ScanTask {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            });
            if let Err(e) = &outcome {
                // Logged only: alerting on these would flood the channel.
                error!(error = %e, "[SCAN] symbol scan failed");
            }
            report.record(&outcome);
        }
        report
    }
}

impl ScanContext {
    async fn scan_symbol(&self, symbol: &Symbol) -> Detection {
        let quotes = self.fetch_quotes(symbol).await;
        let detection = detect(symbol, &quotes, &self.config.arbitrage);
        self.report(&detection).await;
        detection
    }

    /// Fetch from every exchange concurrently and keep the successes, in
    /// configured exchange order.
    async fn fetch_quotes(&self, symbol: &Symbol) -> Vec<Quote> {
        let handles: Vec<_> = self
            .clients
            .iter()
            .map(|client| {
                let client = client.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move { client.fetch_ticker(&symbol).await })
            })
            .collect();

        let mut quotes = Vec::with_capacity(handles.len());
        for (client, joined) in self.clients.iter().zip(join_all(handles).await) {
            let fetched = joined.unwrap_or_else(|e| {
                Err(AppError::fetch(client.id().as_str(), symbol.as_str(), e))
            });
            match fetched {
                Ok(quote) => quotes.push(quote),
                Err(e) => warn!(exchange = %client.id(), %symbol, error = %e, "[CEX] fetch failed"),
            }
        }
        quotes
    }

    async fn report(&self, detection: &Detection) {
        let notifier = self.notifier.as_ref();
        match detection {
            Detection::NoDataAvailable(symbol) => {
                warn!(%symbol, "[SCAN] no data fetched, retrying next tick");
                dispatch(notifier, &format::no_data(symbol)).await;
            }
            Detection::Opportunity(s) => {
                info!(
                    symbol = %s.symbol,
                    buy = %s.buy_exchange,
                    buy_price = s.buy_price,
                    sell = %s.sell_exchange,
                    sell_price = s.sell_price,
                    profit = s.profit_absolute,
                    profit_pct = s.profit_percent,
                    "[OPP] arbitrage opportunity detected"
                );
                dispatch(notifier, &format::opportunity(s)).await;
            }
            Detection::NoOpportunity(s) => {
                debug!(
                    symbol = %s.symbol,
                    spread_pct = s.profit_percent,
                    "[SCAN] no profitable opportunity"
                );
                if digest_due(Local::now(), self.config.digest_interval_minutes) {
                    dispatch(notifier, &format::digest(s)).await;
                }
            }
        }
    }
}
