use chrono::Utc;

use super::types::{ArbitrageConfig, Detection, OpportunitySummary};
use crate::models::{Quote, Symbol};

/// Evaluate one symbol's quotes and classify the best cross-exchange spread.
///
/// `quotes` must be in configured exchange order: on equal prices the
/// earlier quote is chosen for both the buy and the sell leg.
pub fn detect(symbol: &Symbol, quotes: &[Quote], config: &ArbitrageConfig) -> Detection {
    let (Some(lowest_ask), Some(highest_bid)) = (lowest_ask(quotes), highest_bid(quotes)) else {
        return Detection::NoDataAvailable(symbol.clone());
    };

    let buy_price = lowest_ask.ask;
    let sell_price = highest_bid.bid;
    let (profit_absolute, profit_percent) = net_profit(buy_price, sell_price, config.fee_rate);

    let summary = OpportunitySummary {
        symbol: symbol.clone(),
        buy_exchange: lowest_ask.exchange.clone(),
        buy_price,
        sell_exchange: highest_bid.exchange.clone(),
        sell_price,
        profit_absolute,
        profit_percent,
        computed_at: Utc::now(),
    };

    if profit_percent > 0.0 {
        Detection::Opportunity(summary)
    } else {
        Detection::NoOpportunity(summary)
    }
}

/// Net profit per unit and as a percentage of the buy price.
///
/// A zero or non-finite buy price yields `(0.0, 0.0)`, so the result is
/// never NaN or infinite.
pub fn net_profit(buy_price: f64, sell_price: f64, fee_rate: f64) -> (f64, f64) {
    if !buy_price.is_finite() || buy_price <= 0.0 {
        return (0.0, 0.0);
    }
    let gross = sell_price - buy_price;
    let net = gross - buy_price * fee_rate - sell_price * fee_rate;
    (net, net / buy_price * 100.0)
}

fn lowest_ask(quotes: &[Quote]) -> Option<&Quote> {
    quotes.iter().fold(None, |best: Option<&Quote>, q| match best {
        Some(b) if b.ask <= q.ask => Some(b),
        _ => Some(q),
    })
}

fn highest_bid(quotes: &[Quote]) -> Option<&Quote> {
    quotes.iter().fold(None, |best: Option<&Quote>, q| match best {
        Some(b) if b.bid >= q.bid => Some(b),
        _ => Some(q),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(ex: &str, bid: f64, ask: f64) -> Quote {
        Quote::new(ex.into(), "ETH/USDT".into(), Some(bid), Some(ask), Utc::now())
    }

    fn run(quotes: &[Quote], fee_rate: f64) -> Detection {
        detect(&"ETH/USDT".into(), quotes, &ArbitrageConfig { fee_rate })
    }

    #[test]
    fn profitable_spread_is_an_opportunity() {
        let d = run(&[quote("A", 100.0, 101.0), quote("B", 103.0, 104.0)], 0.001);
        let s = match d {
            Detection::Opportunity(s) => s,
            other => panic!("expected opportunity, got {other:?}"),
        };
        assert_eq!(s.buy_exchange.as_str(), "A");
        assert_eq!(s.buy_price, 101.0);
        assert_eq!(s.sell_exchange.as_str(), "B");
        assert_eq!(s.sell_price, 103.0);
        assert!((s.profit_absolute - 1.796).abs() < 1e-9);
        assert!((s.profit_percent - 1.778_217_821_782).abs() < 1e-6);
    }

    #[test]
    fn negative_spread_is_no_opportunity() {
        let d = run(&[quote("A", 100.0, 101.0), quote("B", 100.5, 101.5)], 0.001);
        let s = match d {
            Detection::NoOpportunity(s) => s,
            other => panic!("expected no opportunity, got {other:?}"),
        };
        assert_eq!(s.sell_price - s.buy_price, -0.5);
        assert!(s.profit_percent < 0.0);
    }

    #[test]
    fn empty_input_reports_no_data() {
        assert_eq!(
            run(&[], 0.001),
            Detection::NoDataAvailable("ETH/USDT".into())
        );
    }

    #[test]
    fn zero_ask_is_guarded() {
        let d = run(&[quote("A", 5.0, 0.0), quote("B", 6.0, 1.0)], 0.001);
        let s = match d {
            Detection::NoOpportunity(s) => s,
            other => panic!("expected no opportunity, got {other:?}"),
        };
        assert_eq!(s.profit_percent, 0.0);
        assert!(s.profit_absolute.is_finite());
    }

    #[test]
    fn all_asks_unavailable_is_guarded() {
        let q = Quote::new("A".into(), "ETH/USDT".into(), None, None, Utc::now());
        let d = run(&[q], 0.001);
        let s = d.summary().unwrap();
        assert!(!d.is_opportunity());
        assert_eq!(s.profit_percent, 0.0);
        assert!(!s.profit_percent.is_nan());
    }

    #[test]
    fn single_exchange_compares_its_own_book() {
        let d = run(&[quote("A", 100.0, 100.2)], 0.001);
        let s = d.summary().unwrap();
        assert!(!d.is_opportunity());
        assert_eq!(s.buy_exchange, s.sell_exchange);
    }

    #[test]
    fn picks_extremes_across_many_exchanges() {
        let quotes = [
            quote("A", 99.0, 102.0),
            quote("B", 101.5, 103.0),
            quote("C", 98.0, 100.5),
            quote("D", 100.0, 101.0),
        ];
        let s = run(&quotes, 0.0).summary().cloned().unwrap();
        assert!(quotes.iter().all(|q| s.buy_price <= q.ask));
        assert!(quotes.iter().all(|q| s.sell_price >= q.bid));
        assert_eq!(s.buy_exchange.as_str(), "C");
        assert_eq!(s.sell_exchange.as_str(), "B");
    }

    #[test]
    fn ties_go_to_first_configured_exchange() {
        let quotes = [
            quote("A", 100.0, 101.0),
            quote("B", 100.0, 101.0),
            quote("C", 99.0, 101.0),
        ];
        let s = run(&quotes, 0.001).summary().cloned().unwrap();
        assert_eq!(s.buy_exchange.as_str(), "A");
        assert_eq!(s.sell_exchange.as_str(), "A");
    }

    #[test]
    fn classification_matches_sign_of_percent() {
        let cases = [
            (100.0, 101.0, 103.0, 104.0),
            (100.0, 101.0, 101.0, 102.0),
            (100.0, 100.0, 100.2, 100.3),
            (50.0, 50.05, 50.2, 50.3),
        ];
        for (bid_a, ask_a, bid_b, ask_b) in cases {
            let d = run(&[quote("A", bid_a, ask_a), quote("B", bid_b, ask_b)], 0.001);
            let pct = d.summary().unwrap().profit_percent;
            assert_eq!(d.is_opportunity(), pct > 0.0, "pct={pct}");
        }
    }

    #[test]
    fn profit_never_grows_with_fee_rate() {
        let quotes = [quote("A", 100.0, 101.0), quote("B", 103.0, 104.0)];
        let mut last = f64::INFINITY;
        for step in 0..=20 {
            let fee = step as f64 * 0.0025;
            let pct = run(&quotes, fee).summary().unwrap().profit_percent;
            assert!(pct <= last, "fee={fee} pct={pct} last={last}");
            last = pct;
        }
        assert!(!run(&quotes, 0.05).is_opportunity());
    }
}
