// src/strategies/traits.rs
use crate::error::ConfigError;
use crate::registry::PluginArgs;
use crate::types::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Evaluate once per received series.
    Live,
    /// Replay every prefix of each received series.
    Backtest,
}

/// Outcome of one evaluation of a decision rule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub buy: bool,
    pub sell: bool,
}

/// A decision rule over closed candles.
///
/// Strategies are configured before they are handed to the runtime and are
/// never reconfigured while running. The runtime owns the mapping from
/// decisions to signals, so live and backtest evaluation share this code path.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Applies `args` on top of the current configuration. Unknown keys are
    /// ignored; malformed values fail without partial application.
    fn configure(&mut self, args: &PluginArgs) -> Result<(), ConfigError>;

    fn default_config(&self) -> PluginArgs;

    fn config(&self) -> PluginArgs;

    fn mode(&self) -> EvaluationMode;

    /// Smallest series length (forming candle included) the rule can judge.
    fn min_samples(&self) -> usize;

    /// `closed` contains closed candles only; its last candle is the most
    /// recently closed one.
    fn decide(&self, closed: &Series) -> Decision;
}
