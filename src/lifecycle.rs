//! Process lifecycle: startup warm-up, signal handling and ordered shutdown.
//!
//! `STARTING → RUNNING → STOPPING → STOPPED`. Whatever ends the run (a
//! signal, a failed or interrupted warm-up, a crashed scan loop), every
//! exchange is closed exactly once and the shutdown announcement is sent
//! exactly once.

use futures::future::{join_all, try_join_all};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

use crate::cex::QuoteClient;
use crate::errors::{AppError, Result};
use crate::models::Symbol;
use crate::notifier::{Notifier, dispatch, format};
use crate::scanner::{Scanner, ScannerConfig};

/// Shared "keep scanning" flag. Only the lifecycle flips it; the scanner reads it.
#[derive(Debug, Clone)]
pub struct RunState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }

    /// Request a stop. Returns `true` only for the call that made the transition.
    pub fn stop(&self) -> bool {
        self.tx.send_if_modified(|running| std::mem::replace(running, false))
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Interrupt and terminate signals as a stream. Handlers are registered on
/// the call, so signals arriving during startup are delivered later.
pub fn os_signals() -> Result<BoxStream<'static, ShutdownSignal>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let sigint = signal(SignalKind::interrupt())?;
        let sigterm = signal(SignalKind::terminate())?;
        Ok(stream::unfold((sigint, sigterm), |(mut sigint, mut sigterm)| async move {
            let sig = tokio::select! {
                Some(()) = sigint.recv() => ShutdownSignal::Interrupt,
                Some(()) = sigterm.recv() => ShutdownSignal::Terminate,
                else => return None,
            };
            Some((sig, (sigint, sigterm)))
        })
        .boxed())
    }
    #[cfg(not(unix))]
    {
        Ok(stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok()?;
            Some((ShutdownSignal::Interrupt, ()))
        })
        .boxed())
    }
}

/// Owns the exchange clients for the whole process lifetime.
pub struct Lifecycle {
    clients: Vec<Arc<dyn QuoteClient>>,
    symbols: Vec<Symbol>,
    notifier: Arc<dyn Notifier>,
    scanner_config: ScannerConfig,
    close_timeout: Duration,
    run_state: RunState,
}

impl Lifecycle {
    pub fn new(
        clients: Vec<Arc<dyn QuoteClient>>,
        symbols: Vec<Symbol>,
        notifier: Arc<dyn Notifier>,
        scanner_config: ScannerConfig,
    ) -> Self {
        Self {
            clients,
            symbols,
            notifier,
            scanner_config,
            close_timeout: Duration::from_secs(10),
            run_state: RunState::new(),
        }
    }

    /// Upper bound on a single exchange's close call.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    /// Run until a signal arrives or a fatal error occurs, then shut down.
    ///
    /// Returns the number of completed scan ticks, or the error that ended
    /// the run early. Cleanup has already happened in both cases.
    pub async fn run_with_signals<S>(self, signals: S) -> Result<u64>
    where
        S: Stream<Item = ShutdownSignal> + Send + Unpin + 'static,
    {
        enter(Phase::Starting);
        let exchange_names: Vec<String> = self.clients.iter().map(|c| c.id().to_string()).collect();
        dispatch(
            self.notifier.as_ref(),
            &format::startup(&self.symbols, &exchange_names),
        )
        .await;

        // Listen from the start so a signal can cut a slow warm-up short.
        let (done_tx, done_rx) = oneshot::channel();
        let listener = tokio::spawn(listen_for_signals(
            signals,
            done_rx,
            self.run_state.clone(),
            self.notifier.clone(),
        ));

        let warmed = tokio::select! {
            res = self.warm_up() => res,
            _ = self.run_state.stopped() => {
                info!("[INIT] stop requested during warm-up");
                Ok(())
            }
        };
        let outcome = match warmed {
            Err(e) => {
                error!(error = %e, "[INIT] startup failed");
                dispatch(self.notifier.as_ref(), &format::fatal(&e)).await;
                Err(e)
            }
            Ok(()) if !self.run_state.is_running() => Ok(0),
            Ok(()) => {
                enter(Phase::Running);
                self.scan().await
            }
        };

        enter(Phase::Stopping);
        self.run_state.stop();
        close_all(&self.clients, self.close_timeout).await;

        // Let an in-flight "shutting down" announcement finish first.
        let _ = done_tx.send(());
        if let Err(e) = listener.await {
            warn!(error = %e, "[SHUTDOWN] signal listener ended abnormally");
        }

        enter(Phase::Stopped);
        dispatch(self.notifier.as_ref(), &format::shutdown_complete()).await;
        outcome
    }

    async fn warm_up(&self) -> Result<()> {
        try_join_all(self.clients.iter().map(|client| async move {
            client.load_markets().await.map_err(|e| AppError::Startup {
                exchange: client.id().to_string(),
                source: Box::new(e),
            })
        }))
        .await?;
        Ok(())
    }

    /// Runs the scan loop in its own task so a panic lands here as an error.
    async fn scan(&self) -> Result<u64> {
        let scanner = Scanner::new(
            self.clients.clone(),
            self.symbols.clone(),
            self.notifier.clone(),
            self.scanner_config.clone(),
        );
        let run_state = self.run_state.clone();
        match tokio::spawn(async move { scanner.run(&run_state).await }).await {
            Ok(ticks) => Ok(ticks),
            Err(join_err) => {
                let e = AppError::Other(format!("scan loop crashed: {join_err}"));
                error!(error = %e, "[SCAN] unexpected error");
                dispatch(self.notifier.as_ref(), &format::fatal(&e)).await;
                Err(e)
            }
        }
    }
}

fn enter(phase: Phase) {
    info!(?phase, "[LIFECYCLE] phase");
}

async fn listen_for_signals<S>(
    mut signals: S,
    mut done: oneshot::Receiver<()>,
    run_state: RunState,
    notifier: Arc<dyn Notifier>,
) where
    S: Stream<Item = ShutdownSignal> + Unpin,
{
    loop {
        let sig = tokio::select! {
            biased;
            _ = &mut done => break,
            sig = signals.next() => match sig {
                Some(sig) => sig,
                None => break,
            },
        };
        if run_state.stop() {
            warn!(signal = %sig, "[SHUTDOWN] graceful shutdown initiated");
            dispatch(notifier.as_ref(), &format::shutdown_initiated()).await;
        } else {
            info!(signal = %sig, "[SHUTDOWN] already stopping, signal ignored");
        }
    }
}

/// Close every client concurrently; failures and timeouts are logged, not
/// returned. Returns how many closes failed.
pub async fn close_all(clients: &[Arc<dyn QuoteClient>], timeout: Duration) -> usize {
    info!(count = clients.len(), "[SHUTDOWN] closing exchange connections");
    let results = join_all(clients.iter().map(|client| async move {
        let res = match tokio::time::timeout(timeout, client.close()).await {
            Ok(res) => res.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {timeout:?}")),
        };
        (client.id().to_string(), res)
    }))
    .await;

    let mut failures = 0;
    for (exchange, res) in results {
        match res {
            Ok(()) => info!(%exchange, "[SHUTDOWN] connection closed"),
            Err(reason) => {
                failures += 1;
                let e = AppError::Close { exchange, reason };
                error!(error = %e, "[SHUTDOWN] close failed");
            }
        }
    }
    info!(failures, "[SHUTDOWN] all connections closed");
    failures
}
