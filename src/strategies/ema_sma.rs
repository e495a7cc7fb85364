// src/strategies/ema_sma.rs
use crate::error::ConfigError;
use crate::registry::PluginArgs;
use crate::strategies::indicators::{apply, crossover, crossunder};
use crate::strategies::traits::{Decision, EvaluationMode, Strategy};
use crate::types::Series;
use ta::indicators::{ExponentialMovingAverage, RelativeStrengthIndex, SimpleMovingAverage};

pub const NAME: &str = "Ema/Sma";

const KEY_SMA_LEN: &str = "sma_len";
const KEY_EMA_LEN: &str = "ema_len";
const KEY_RSI_LEN: &str = "rsi_len";
const KEY_RSI_BUY_MAX: &str = "rsi_buy_max";
const KEY_BACKTEST: &str = "backtest";

/// Trend-following crossover of a fast EMA over a slow SMA.
///
/// * BUY when the EMA crosses above the SMA, RSI is below `rsi_buy_max`
///   and the last closed candle closed above its open.
/// * SELL when the EMA crosses below the SMA.
///
/// Configuration keys may be given bare (`sma_len`) or prefixed with the
/// strategy name (`Ema/Sma.sma_len`).
#[derive(Debug, Clone, PartialEq)]
pub struct EmaSma {
    sma_len: usize,
    ema_len: usize,
    rsi_len: usize,
    rsi_buy_max: f64,
    backtest: bool,
}

impl Default for EmaSma {
    fn default() -> Self {
        Self {
            sma_len: 14,
            ema_len: 7,
            rsi_len: 14,
            rsi_buy_max: 90.0,
            backtest: false,
        }
    }
}

impl EmaSma {
    fn to_args(&self) -> PluginArgs {
        [
            (KEY_SMA_LEN, self.sma_len.to_string()),
            (KEY_EMA_LEN, self.ema_len.to_string()),
            (KEY_RSI_LEN, self.rsi_len.to_string()),
            (KEY_RSI_BUY_MAX, self.rsi_buy_max.to_string()),
            (KEY_BACKTEST, self.backtest.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (format!("{}.{}", NAME, k), v))
        .collect()
    }
}

fn bare_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    let prefix = format!("{}.", NAME.to_lowercase());
    match key.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

fn parse_len(key: &str, value: &str) -> Result<usize, ConfigError> {
    let len = value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::invalid(key, e))?;
    if len == 0 {
        return Err(ConfigError::invalid(key, "must be at least 1"));
    }
    Ok(len)
}

impl Strategy for EmaSma {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, args: &PluginArgs) -> Result<(), ConfigError> {
        let mut next = self.clone();
        for (key, value) in args {
            match bare_key(key).as_str() {
                KEY_SMA_LEN => next.sma_len = parse_len(key, value)?,
                KEY_EMA_LEN => next.ema_len = parse_len(key, value)?,
                KEY_RSI_LEN => next.rsi_len = parse_len(key, value)?,
                KEY_RSI_BUY_MAX => {
                    next.rsi_buy_max = value
                        .trim()
                        .parse::<f64>()
                        .map_err(|e| ConfigError::invalid(key.as_str(), e))?
                }
                KEY_BACKTEST => next.backtest = value.trim().eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        *self = next;
        Ok(())
    }

    fn default_config(&self) -> PluginArgs {
        EmaSma::default().to_args()
    }

    fn config(&self) -> PluginArgs {
        self.to_args()
    }

    fn mode(&self) -> EvaluationMode {
        if self.backtest {
            EvaluationMode::Backtest
        } else {
            EvaluationMode::Live
        }
    }

    fn min_samples(&self) -> usize {
        self.sma_len.max(self.ema_len).max(self.rsi_len) + 2
    }

    fn decide(&self, closed: &Series) -> Decision {
        let (Ok(sma), Ok(ema), Ok(rsi)) = (
            SimpleMovingAverage::new(self.sma_len),
            ExponentialMovingAverage::new(self.ema_len),
            RelativeStrengthIndex::new(self.rsi_len),
        ) else {
            return Decision::default();
        };
        let Some(last) = closed.current() else {
            return Decision::default();
        };

        let closes = closed.closes();
        let sma = apply(sma, &closes);
        let ema = apply(ema, &closes);
        let rsi = apply(rsi, &closes);

        let rsi_ok = rsi.last().is_some_and(|r| *r < self.rsi_buy_max);
        let bullish = last.close > last.open;

        Decision {
            buy: crossover(&ema, &sma) && rsi_ok && bullish,
            sell: crossunder(&ema, &sma),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetPair, Candle};
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;

    fn args(pairs: &[(&str, &str)]) -> PluginArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn closed_series(closes: &[f64]) -> Series {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let mut prev = closes.first().copied().unwrap_or_default();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let open_time = start + Duration::hours(i as i64);
                let open = Decimal::try_from(prev).unwrap();
                let close_d = Decimal::try_from(*close).unwrap();
                prev = *close;
                Candle {
                    open,
                    high: open.max(close_d),
                    low: open.min(close_d),
                    close: close_d,
                    volume: Decimal::ONE,
                    open_time,
                    close_time: open_time + Duration::hours(1),
                }
            })
            .collect();
        Series::new(AssetPair::new("BTC", "USDT"), "1h".parse().unwrap(), candles)
    }

    #[test]
    fn configures_from_prefixed_and_bare_keys() {
        let mut strategy = EmaSma::default();
        strategy
            .configure(&args(&[
                ("Ema/Sma.sma_len", "20"),
                ("ema_len", "5"),
                ("EMA/SMA.RSI_BUY_MAX", "70.5"),
                ("backtest", "TRUE"),
                ("unrelated", "whatever"),
            ]))
            .unwrap();

        assert_eq!(strategy.sma_len, 20);
        assert_eq!(strategy.ema_len, 5);
        assert_eq!(strategy.rsi_buy_max, 70.5);
        assert_eq!(strategy.mode(), EvaluationMode::Backtest);
        assert_eq!(strategy.min_samples(), 22);
        assert_eq!(strategy.config()["Ema/Sma.sma_len"], "20");
        assert_eq!(strategy.default_config()["Ema/Sma.sma_len"], "14");
    }

    #[test]
    fn malformed_values_leave_config_untouched() {
        let mut strategy = EmaSma::default();
        let err = strategy
            .configure(&args(&[("ema_len", "3"), ("sma_len", "fourteen")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(strategy, EmaSma::default());

        assert!(strategy.configure(&args(&[("rsi_len", "0")])).is_err());
    }

    #[test]
    fn sells_when_fast_average_crosses_down() {
        let strategy = EmaSma::default();
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.extend([100.0, 90.0, 80.0]);

        // Walk forward until the EMA drops below the SMA.
        let crossed = (strategy.min_samples()..=closes.len())
            .map(|n| strategy.decide(&closed_series(&closes[..n])))
            .any(|d| d.sell);
        assert!(crossed);
    }

    #[test]
    fn buys_on_bullish_cross_up() {
        let strategy = EmaSma::default();
        let mut closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        closes.extend([180.0, 195.0, 210.0]);

        let decisions: Vec<Decision> = (strategy.min_samples()..=closes.len())
            .map(|n| strategy.decide(&closed_series(&closes[..n])))
            .collect();
        assert!(decisions.iter().any(|d| d.buy));
        assert!(decisions.iter().all(|d| !(d.buy && d.sell)));
    }

    #[test]
    fn flat_market_is_quiet() {
        let strategy = EmaSma::default();
        let closes = vec![100.0; 40];
        let decision = strategy.decide(&closed_series(&closes));
        assert_eq!(decision, Decision::default());
    }
}
