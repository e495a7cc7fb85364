// src/types/signal.rs
use super::{AssetPair, Side};
use chrono::{DateTime, Utc};
use std::fmt;

/// A strategy's buy/sell decision for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub strategy: String,
    pub asset: AssetPair,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub is_backtest: bool,
}

impl Signal {
    pub fn live(strategy: &str, asset: AssetPair, side: Side) -> Self {
        Self {
            strategy: strategy.to_string(),
            asset,
            side,
            timestamp: Utc::now(),
            is_backtest: false,
        }
    }

    /// A replayed signal, stamped with the candle time it was found at.
    pub fn backtest(
        strategy: &str,
        asset: AssetPair,
        side: Side,
        candle_time: DateTime<Utc>,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            asset,
            side,
            timestamp: candle_time,
            is_backtest: true,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {} {}",
            self.strategy, self.asset, self.side, self.timestamp
        )?;
        if self.is_backtest {
            f.write_str(" (backtest)")?;
        }
        Ok(())
    }
}
