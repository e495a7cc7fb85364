// src/types/order.rs
use super::{AssetPair, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    GoodTillCancel,
    ImmediateOrCancel,
    FillOrKill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// The order is finished on the venue and will not fill any further.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Venue-facing order request. `reference` becomes the client order id.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub reference: Uuid,
    pub asset: AssetPair,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: Option<TimeInForce>,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

impl Order {
    pub fn market(asset: AssetPair, side: Side, quantity: Decimal) -> Self {
        Self {
            reference: Uuid::new_v4(),
            asset,
            side,
            order_type: OrderType::Market,
            time_in_force: None,
            quantity,
            price: None,
        }
    }

    pub fn limit(
        asset: AssetPair,
        side: Side,
        time_in_force: TimeInForce,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            reference: Uuid::new_v4(),
            asset,
            side,
            order_type: OrderType::Limit,
            time_in_force: Some(time_in_force),
            quantity,
            price: Some(price),
        }
    }
}

/// Everything needed to look an order up again later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReference {
    pub asset: AssetPair,
    pub client_id: Uuid,
    pub venue_id: Option<i64>,
}

/// One (partial) execution of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderInfo {
    pub reference: OrderReference,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub original_quantity: Decimal,
    pub executed_quantity: Decimal,
    pub price: Decimal,
    pub transaction_time: DateTime<Utc>,
    pub fills: Vec<Fill>,
}

/// Base quantity actually acquired through `fills`: the filled quantity minus
/// any commission that was charged in the base asset itself.
pub fn net_quantity(fills: &[Fill], base_asset: &str) -> Decimal {
    fills.iter().fold(Decimal::ZERO, |acc, fill| {
        if fill.commission_asset.eq_ignore_ascii_case(base_asset) {
            acc + fill.quantity - fill.commission
        } else {
            acc + fill.quantity
        }
    })
}
