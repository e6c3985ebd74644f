//! Cross-exchange opportunity detection.

pub mod evaluator;
pub mod types;

pub use evaluator::{detect, net_profit};
pub use types::{ArbitrageConfig, Detection, OpportunitySummary};
