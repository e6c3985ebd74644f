//! In-memory exchange and notifier fakes for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::cex::QuoteClient;
use crate::errors::{AppError, Result};
use crate::lifecycle::RunState;
use crate::models::{ExchangeId, Quote, Symbol};
use crate::notifier::{Notifier, NotifyError};

#[derive(Debug, Clone, Copy)]
enum Ticker {
    Book { bid: f64, ask: f64 },
    Fail,
    Panic,
}

pub struct MockExchange {
    id: ExchangeId,
    tickers: HashMap<Symbol, Ticker>,
    delay: Duration,
    load_delay: Duration,
    fail_load: bool,
    fail_close: bool,
    hang_close: bool,
    stop_on_fetch: Option<RunState>,
    panic_on_id_call: Option<u32>,
    id_calls: AtomicU32,
    fetch_calls: AtomicU32,
    close_calls: AtomicU32,
}

impl MockExchange {
    pub fn new(name: &str) -> Self {
        Self {
            id: ExchangeId::new(name),
            tickers: HashMap::new(),
            delay: Duration::ZERO,
            load_delay: Duration::ZERO,
            fail_load: false,
            fail_close: false,
            hang_close: false,
            stop_on_fetch: None,
            panic_on_id_call: None,
            id_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            close_calls: AtomicU32::new(0),
        }
    }

    pub fn with_quote(mut self, symbol: &str, bid: f64, ask: f64) -> Self {
        self.tickers.insert(symbol.into(), Ticker::Book { bid, ask });
        self
    }

    pub fn failing_fetch(mut self, symbol: &str) -> Self {
        self.tickers.insert(symbol.into(), Ticker::Fail);
        self
    }

    pub fn panicking_fetch(mut self, symbol: &str) -> Self {
        self.tickers.insert(symbol.into(), Ticker::Panic);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Panic on the `call`-th invocation of `id()` (1-based) and no other.
    pub fn panicking_id_on_call(mut self, call: u32) -> Self {
        self.panic_on_id_call = Some(call);
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn hanging_close(mut self) -> Self {
        self.hang_close = true;
        self
    }

    /// Flip `state` to stopped on the first fetch.
    pub fn stopping_on_fetch(mut self, state: RunState) -> Self {
        self.stop_on_fetch = Some(state);
        self
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteClient for MockExchange {
    fn id(&self) -> &ExchangeId {
        let call = self.id_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on_id_call == Some(call) {
            panic!("mock exchange {} id lookup #{call} blew up", self.id);
        }
        &self.id
    }

    async fn load_markets(&self) -> Result<()> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail_load {
            return Err(AppError::exchange(self.id.as_str(), "markets unavailable"));
        }
        Ok(())
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Quote> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(state) = &self.stop_on_fetch {
            state.stop();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.tickers.get(symbol) {
            Some(Ticker::Book { bid, ask }) => Ok(Quote::new(
                self.id.clone(),
                symbol.clone(),
                Some(*bid),
                Some(*ask),
                Utc::now(),
            )),
            Some(Ticker::Panic) => panic!("mock exchange {} blew up", self.id),
            Some(Ticker::Fail) | None => Err(AppError::fetch(
                self.id.as_str(),
                symbol.as_str(),
                "connection reset",
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_close {
            std::future::pending::<()>().await;
        }
        if self.fail_close {
            return Err(AppError::exchange(self.id.as_str(), "socket already gone"));
        }
        Ok(())
    }
}

/// Records every delivered message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    panic_on: Option<String>,
}

impl RecordingNotifier {
    /// Panic when a message mentions `needle`, simulating an unexpected bug.
    pub fn panicking_on(mut self, needle: &str) -> Self {
        self.panic_on = Some(needle.to_string());
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> std::result::Result<(), NotifyError> {
        if let Some(needle) = &self.panic_on {
            if message.contains(needle.as_str()) {
                panic!("notifier choked on {needle}");
            }
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
