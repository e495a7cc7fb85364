// src/connectors/messages.rs
//! Binance REST payloads. Decimal fields arrive as JSON strings.
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Одна свеча из /api/v3/klines (массив из 12 элементов).
#[derive(Debug, Deserialize)]
pub struct RawKline(
    pub i64,     // open time
    pub Decimal, // open
    pub Decimal, // high
    pub Decimal, // low
    pub Decimal, // close
    pub Decimal, // volume
    pub i64,     // close time
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
);

#[derive(Debug, Deserialize)]
pub struct RawDepth {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Deserialize)]
pub struct RawTickerPrice {
    pub symbol: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RawBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Commissions are reported in basis points.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    pub maker_commission: i64,
    pub taker_commission: i64,
    pub buyer_commission: i64,
    pub seller_commission: i64,
    pub balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilter {
    pub filter_type: String,
    #[serde(default)]
    pub tick_size: Option<Decimal>,
    #[serde(default)]
    pub step_size: Option<Decimal>,
    #[serde(default)]
    pub min_qty: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct RawSymbol {
    pub symbol: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    pub filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
pub struct RawExchangeInfo {
    pub symbols: Vec<RawSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFill {
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

/// Order as returned by placement (FULL response) and by order lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    #[serde(default)]
    pub transact_time: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    #[serde(default)]
    pub fills: Vec<RawFill>,
}

/// Одна сделка из /api/v3/myTrades.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    pub order_id: i64,
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

#[derive(Debug, Deserialize)]
pub struct RawApiError {
    pub code: i64,
    pub msg: String,
}
