// src/types/mod.rs
use std::fmt;

mod asset;
mod market;
mod order;
mod series;
mod signal;
mod timeframe;

pub use asset::AssetPair;
pub use market::{AccountInfo, Balance, BookLevel, Commissions, OrderBook, SymbolInfo};
pub use order::{
    net_quantity, Fill, Order, OrderInfo, OrderReference, OrderStatus, OrderType, TimeInForce,
};
pub use series::{Candle, Series};
pub use signal::Signal;
pub use timeframe::{Timeframe, TimeframeUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}
