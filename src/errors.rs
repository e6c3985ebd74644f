use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A single (exchange, symbol) quote could not be fetched this tick.
    #[error("Fetch failed on {exchange} for {symbol}: {reason}")]
    Fetch {
        exchange: String,
        symbol: String,
        reason: String,
    },

    #[error("{exchange} API error: {message}")]
    Exchange { exchange: String, message: String },

    /// Warm-up against an exchange failed; fatal for the process.
    #[error("Startup failed on {exchange}: {source}")]
    Startup {
        exchange: String,
        #[source]
        source: Box<AppError>,
    },

    /// A symbol's scan task failed outside the normal fetch/detect path.
    #[error("Scan of {symbol} failed: {reason}")]
    ScanTask { symbol: String, reason: String },

    #[error("Closing {exchange} failed: {reason}")]
    Close { exchange: String, reason: String },

    #[error("Other: {0}")]
    Other(String),
}

impl AppError {
    pub fn fetch(exchange: impl Into<String>, symbol: impl Into<String>, reason: impl ToString) -> Self {
        AppError::Fetch {
            exchange: exchange.into(),
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    pub fn exchange(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Exchange {
            exchange: exchange.into(),
            message: message.into(),
        }
    }
}
