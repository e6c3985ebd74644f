//! Alert message bodies (Telegram Markdown).

use chrono::Local;

use crate::arbitrage::OpportunitySummary;
use crate::models::Symbol;
use crate::utils::format_timestamp;

pub fn opportunity(s: &OpportunitySummary) -> String {
    format!(
        "🚨 *ARBITRAGE OPPORTUNITY* 🚨\n\
         *Time:* {}\n\
         *Pair:* {}\n\
         *Buy:* {} at ${}\n\
         *Sell:* {} at ${}\n\
         *Profit:* ${:.2} ({:.5}%)",
        format_timestamp(&s.computed_at.with_timezone(&Local)),
        s.symbol,
        s.buy_exchange,
        s.buy_price,
        s.sell_exchange,
        s.sell_price,
        s.profit_absolute,
        s.profit_percent,
    )
}

pub fn digest(s: &OpportunitySummary) -> String {
    format!(
        "📊 *Market Update* - {}\n\
         No profitable opportunities for {}\n\
         Best spread: Buy {} (${}) → Sell {} (${})\n\
         Spread: {:.5}%",
        format_timestamp(&s.computed_at.with_timezone(&Local)),
        s.symbol,
        s.buy_exchange,
        s.buy_price,
        s.sell_exchange,
        s.sell_price,
        s.profit_percent,
    )
}

pub fn no_data(symbol: &Symbol) -> String {
    format!("⚠️ No data fetched for {symbol} from exchanges, retrying...")
}

pub fn startup(symbols: &[Symbol], exchanges: &[String]) -> String {
    let symbols: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
    format!(
        "🤖 Arbitrage Bot Started\nMonitoring {} across {}",
        symbols.join(", "),
        exchanges.join(", ")
    )
}

pub fn fatal(err: &dyn std::fmt::Display) -> String {
    format!("❌ Error in main process: {err}")
}

pub fn shutdown_initiated() -> String {
    "🛑 Bot shutting down gracefully...".to_string()
}

pub fn shutdown_complete() -> String {
    "👋 Bot has shut down".to_string()
}
