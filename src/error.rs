// src/error.rs
use crate::types::{AssetPair, OrderStatus, Timeframe};
use rust_decimal::Decimal;
use thiserror::Error;

/// Bad settings, plugin arguments or trade parameters. Fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid timeframe '{0}'")]
    InvalidTimeframe(String),

    #[error("invalid trade volume type '{0}', expected fixed or pct")]
    InvalidVolumeType(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("no {kind} registered under '{name}' (available: {available})")]
    UnknownPlugin {
        kind: &'static str,
        name: String,
        available: String,
    },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures reported by a venue driver.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("venue rejected request (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("failed to decode venue response: {0}")]
    Decode(String),

    #[error("symbol {0} is not available on this venue")]
    UnknownSymbol(AssetPair),

    #[error("timeframe {0} is not offered by this venue")]
    UnsupportedTimeframe(Timeframe),

    #[error("request signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{asset} [{timeframe}] is already registered")]
    AlreadyRegistered { asset: AssetPair, timeframe: Timeframe },
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("insufficient funds to buy {asset}: required {required}, available {available}")]
    InsufficientFunds {
        asset: AssetPair,
        required: Decimal,
        available: Decimal,
    },

    #[error("order book for {0} has no asks")]
    EmptyOrderBook(AssetPair),

    #[error("order quantity for {0} rounds below the tradable minimum")]
    ZeroQuantity(AssetPair),

    #[error("no usable limit price for {asset}: {price}")]
    InvalidPrice { asset: AssetPair, price: Decimal },

    #[error("buy order for {asset} was not filled (status {status:?})")]
    NotFilled { asset: AssetPair, status: OrderStatus },

    #[error("order placement failed: {0}")]
    Order(#[source] VenueError),

    #[error(transparent)]
    Venue(#[from] VenueError),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("notification service error {code}: {message}")]
    Service { code: i64, message: String },
}
