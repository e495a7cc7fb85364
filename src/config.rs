// src/config.rs

use crate::error::ConfigError;
use crate::registry::PluginArgs;
use crate::types::{AssetPair, Timeframe};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Upper bound for percent sizing: never commit the entire quote balance.
pub const MAX_PCT_VOLUME: Decimal = Decimal::from_parts(999, 0, 0, false, 3);

#[derive(Debug, Deserialize, Clone)]
pub struct AssetSettings {
    pub base: String,
    pub quote: String,
    pub timeframe: String,
}

impl AssetSettings {
    pub fn pair(&self) -> AssetPair {
        AssetPair::new(&self.base, &self.quote)
    }

    pub fn timeframe(&self) -> Result<Timeframe, ConfigError> {
        self.timeframe.parse()
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            timeframe: "4h".to_string(),
        }
    }
}

/// Name of a registered plugin plus its free-form arguments.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PluginSettings {
    pub name: String,
    #[serde(default)]
    pub args: PluginArgs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradeSettings {
    #[serde(default = "default_volume_type")]
    pub volume_type: String,
    #[serde(default = "default_volume")]
    pub volume: Decimal,
    #[serde(default = "default_true")]
    pub reduce: bool,
    // Paper trading unless explicitly switched off
    #[serde(default = "default_true")]
    pub paper: bool,
    #[serde(default)]
    pub max_slippage: Option<Decimal>,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            volume_type: default_volume_type(),
            volume: default_volume(),
            reduce: true,
            paper: true,
            max_slippage: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub asset: AssetSettings,
    pub exchange: PluginSettings,
    pub strategy: PluginSettings,
    #[serde(default = "default_notifier")]
    pub notifier: PluginSettings,
    #[serde(default)]
    pub trade: TradeSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl AppConfig {
    /// Reads `Settings.{toml,yaml,json}` (optional) overlaid with `APP__*`
    /// environment variables, e.g. `APP__TRADE__PAPER=false`.
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        Self::from_config(builder.build()?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Ok(config.try_deserialize()?)
    }
}

fn default_volume_type() -> String {
    "pct".to_string()
}

fn default_volume() -> Decimal {
    Decimal::ONE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_notifier() -> PluginSettings {
    PluginSettings {
        name: "noop".to_string(),
        args: PluginArgs::new(),
    }
}

/// How much quote asset a buy commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSizing {
    /// Absolute quote amount.
    Fixed(Decimal),
    /// Fraction of the free quote balance, at most [`MAX_PCT_VOLUME`].
    Percent(Decimal),
}

/// Validated trade policy. Built once at start-up, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeConfig {
    pub sizing: TradeSizing,
    pub reduce: bool,
    pub paper: bool,
    pub max_slippage: Option<Decimal>,
}

impl TradeConfig {
    pub fn new(
        volume_type: &str,
        volume: Decimal,
        reduce: bool,
        paper: bool,
        max_slippage: Option<Decimal>,
    ) -> Result<Self, ConfigError> {
        if volume <= Decimal::ZERO {
            return Err(ConfigError::invalid("trade.volume", "must be positive"));
        }
        let sizing = match volume_type.trim().to_lowercase().as_str() {
            "fixed" => TradeSizing::Fixed(volume),
            "pct" | "percent" => TradeSizing::Percent(volume.min(MAX_PCT_VOLUME)),
            _ => return Err(ConfigError::InvalidVolumeType(volume_type.to_string())),
        };
        if let Some(slippage) = max_slippage {
            if slippage < Decimal::ZERO {
                return Err(ConfigError::invalid("trade.max_slippage", "must not be negative"));
            }
        }
        Ok(Self {
            sizing,
            reduce,
            paper,
            max_slippage,
        })
    }
}

impl TryFrom<&TradeSettings> for TradeConfig {
    type Error = ConfigError;

    fn try_from(settings: &TradeSettings) -> Result<Self, Self::Error> {
        TradeConfig::new(
            &settings.volume_type,
            settings.volume,
            settings.reduce,
            settings.paper,
            settings.max_slippage,
        )
    }
}
