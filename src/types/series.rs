// src/types/series.rs
use super::{AssetPair, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// One OHLCV interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

/// Candle history for one pair and timeframe, oldest first.
///
/// The last candle is the one still forming; the one before it is the most
/// recently closed candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub asset: AssetPair,
    pub timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl Series {
    pub fn new(asset: AssetPair, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self {
            asset,
            timeframe,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// The forming candle.
    pub fn current(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The first `len` candles, keeping the "last is current" convention for
    /// the prefix. `len` past the end returns the whole series.
    pub fn sub_series(&self, len: usize) -> Series {
        let len = len.min(self.candles.len());
        Series {
            asset: self.asset.clone(),
            timeframe: self.timeframe,
            candles: self.candles[..len].to_vec(),
        }
    }

    /// Close prices as `f64` for indicator math.
    pub fn closes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}
