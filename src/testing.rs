// src/testing.rs
//! In-memory collaborators shared by the unit tests.
use crate::connectors::traits::VenueDriver;
use crate::error::{NotifyError, VenueError};
use crate::notifiers::Notifier;
use crate::types::{
    AccountInfo, AssetPair, Balance, BookLevel, Candle, Fill, Order, OrderBook, OrderInfo,
    OrderReference, OrderStatus, Series, SymbolInfo, Timeframe,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub fn btc_usdt() -> AssetPair {
    AssetPair::new("BTC", "USDT")
}

/// Two 4h candles: one closed, the forming one opening at the epoch.
pub fn epoch_candles() -> Vec<Candle> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    [epoch - Duration::hours(4), epoch]
        .into_iter()
        .map(|open_time| Candle {
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1),
            open_time,
            close_time: open_time + Duration::hours(4) - Duration::milliseconds(1),
        })
        .collect()
}

fn scripted(what: &str) -> VenueError {
    VenueError::Api {
        code: -1,
        message: format!("scripted {what} failure"),
    }
}

pub struct MockState {
    pub calls: Vec<String>,
    pub account: AccountInfo,
    pub book: OrderBook,
    pub ticker: Decimal,
    pub symbol: SymbolInfo,
    pub candles: Vec<Candle>,
    /// Number of upcoming `get_series` calls that fail.
    pub series_failures: usize,
    pub place_status: OrderStatus,
    pub fail_place: bool,
    pub fail_get_order: bool,
    pub fail_ticker: bool,
    pub panic_on_book: bool,
    pub fills: Vec<Fill>,
    pub placed: Vec<Order>,
    orders: HashMap<Uuid, OrderInfo>,
    next_venue_id: i64,
}

pub struct MockVenue {
    state: Mutex<MockState>,
}

impl MockVenue {
    /// 1000 USDT free, deep asks at 100, tick 0.01, step 0.001.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                account: AccountInfo {
                    balances: vec![Balance {
                        asset: "USDT".into(),
                        free: dec!(1000),
                        locked: dec!(0),
                    }],
                    ..AccountInfo::default()
                },
                book: OrderBook {
                    bids: vec![BookLevel {
                        price: dec!(99.9),
                        quantity: dec!(1000),
                    }],
                    asks: vec![BookLevel {
                        price: dec!(100),
                        quantity: dec!(1000),
                    }],
                },
                ticker: dec!(100),
                symbol: SymbolInfo {
                    tick_size: dec!(0.01),
                    step_size: dec!(0.001),
                    min_qty: dec!(0.001),
                },
                candles: epoch_candles(),
                series_failures: 0,
                place_status: OrderStatus::Filled,
                fail_place: false,
                fail_get_order: false,
                fail_ticker: false,
                panic_on_book: false,
                fills: Vec::new(),
                placed: Vec::new(),
                orders: HashMap::new(),
                next_venue_id: 1,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn set_free_quote(&self, free: Decimal) {
        let mut state = self.state();
        state.account.balances = vec![Balance {
            asset: "USDT".into(),
            free,
            locked: Decimal::ZERO,
        }];
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(call))
            .count()
    }

    pub fn placed(&self) -> Vec<Order> {
        self.state().placed.clone()
    }

    fn record(&self, call: String) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl VenueDriver for MockVenue {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_account_info(&self) -> Result<AccountInfo, VenueError> {
        Ok(self.record("get_account_info".into()).account.clone())
    }

    async fn get_series(
        &self,
        asset: &AssetPair,
        timeframe: Timeframe,
    ) -> Result<Series, VenueError> {
        let mut state = self.record(format!("get_series {asset}"));
        if state.series_failures > 0 {
            state.series_failures -= 1;
            return Err(scripted("series"));
        }
        Ok(Series::new(asset.clone(), timeframe, state.candles.clone()))
    }

    async fn get_order_book(&self, asset: &AssetPair) -> Result<OrderBook, VenueError> {
        let state = self.record(format!("get_order_book {asset}"));
        if state.panic_on_book {
            drop(state);
            panic!("scripted order book panic");
        }
        Ok(state.book.clone())
    }

    async fn get_ticker(&self, asset: &AssetPair) -> Result<Decimal, VenueError> {
        let state = self.record(format!("get_ticker {asset}"));
        if state.fail_ticker {
            return Err(scripted("ticker"));
        }
        Ok(state.ticker)
    }

    async fn get_symbol_info(&self, asset: &AssetPair) -> Result<SymbolInfo, VenueError> {
        Ok(self.record(format!("get_symbol_info {asset}")).symbol.clone())
    }

    async fn place_order(
        &self,
        order: &Order,
        _constraints: Option<&SymbolInfo>,
    ) -> Result<OrderInfo, VenueError> {
        let mut state = self.record(format!("place_order {}", order.asset));
        state.placed.push(order.clone());
        if state.fail_place {
            return Err(scripted("order"));
        }

        let filled = state.place_status == OrderStatus::Filled;
        let venue_id = state.next_venue_id;
        state.next_venue_id += 1;
        let info = OrderInfo {
            reference: OrderReference {
                asset: order.asset.clone(),
                client_id: order.reference,
                venue_id: Some(venue_id),
            },
            side: order.side,
            order_type: order.order_type,
            status: state.place_status,
            original_quantity: order.quantity,
            executed_quantity: if filled { order.quantity } else { Decimal::ZERO },
            price: order.price.unwrap_or(state.ticker),
            transaction_time: Utc::now(),
            fills: if filled { state.fills.clone() } else { Vec::new() },
        };
        state.orders.insert(order.reference, info.clone());
        Ok(info)
    }

    async fn get_order(&self, reference: &OrderReference) -> Result<OrderInfo, VenueError> {
        let state = self.record(format!("get_order {}", reference.asset));
        if state.fail_get_order {
            return Err(scripted("lookup"));
        }
        state
            .orders
            .get(&reference.client_id)
            .cloned()
            .ok_or_else(|| VenueError::Api {
                code: -2013,
                message: "Order does not exist.".into(),
            })
    }

    async fn get_order_fills(&self, order: &OrderInfo) -> Result<Vec<Fill>, VenueError> {
        Ok(self
            .record(format!("get_order_fills {}", order.reference.asset))
            .fills
            .clone())
    }
}

/// Keeps every message; optionally fails each call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, message: &[u8]) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(message).into_owned());
        if self.fail {
            return Err(NotifyError::Service {
                code: 500,
                message: "scripted".into(),
            });
        }
        Ok(())
    }
}
