// src/core/executor.rs
//! Turns live signals into orders and tracks at most one open position per pair.
//!
//! The position map is owned by the executor and mutated only through
//! `&mut self`; the engine drives it from a single task.
use crate::config::{TradeConfig, TradeSizing};
use crate::connectors::traits::VenueDriver;
use crate::error::ExecutionError;
use crate::notifiers::Notifier;
use crate::types::{
    net_quantity, AssetPair, Fill, Order, OrderReference, Side, Signal, SymbolInfo, TimeInForce,
};
use crate::utils::precision::floor_to_step;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Share of the free quote balance a fixed-size buy may use; the rest covers fees.
pub const FIXED_HEADROOM: Decimal = Decimal::from_parts(995, 0, 0, false, 3);

/// What is needed to close an open position later.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenTrade {
    Live(OrderReference),
    Paper {
        reference: Uuid,
        quantity: Decimal,
        entry_price: Decimal,
    },
}

/// Outcome of one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Opened {
        quantity: Decimal,
        price: Decimal,
    },
    /// `confirmed` is false when the venue did not accept the sell; the
    /// position is cleared locally regardless.
    Closed {
        quantity: Decimal,
        confirmed: bool,
    },
    /// Buy while open or sell while flat.
    Ignored,
    /// Replayed signal, reported only.
    Backtest,
}

pub struct OrderExecutor {
    venue: Arc<dyn VenueDriver>,
    notifier: Arc<dyn Notifier>,
    config: TradeConfig,
    positions: HashMap<AssetPair, OpenTrade>,
    symbols: HashMap<AssetPair, SymbolInfo>,
}

impl OrderExecutor {
    pub fn new(
        venue: Arc<dyn VenueDriver>,
        notifier: Arc<dyn Notifier>,
        config: TradeConfig,
    ) -> Self {
        Self {
            venue,
            notifier,
            config,
            positions: HashMap::new(),
            symbols: HashMap::new(),
        }
    }

    pub fn position(&self, asset: &AssetPair) -> Option<&OpenTrade> {
        self.positions.get(asset)
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub async fn execute(&mut self, signal: &Signal) -> Result<Execution, ExecutionError> {
        if signal.is_backtest {
            info!(signal = %signal, "Backtest signal");
            return Ok(Execution::Backtest);
        }

        match signal.side {
            Side::Buy if self.positions.contains_key(&signal.asset) => {
                debug!(asset = %signal.asset, "Position already open, ignoring buy");
                Ok(Execution::Ignored)
            }
            Side::Buy => self.open(&signal.asset).await,
            Side::Sell => match self.positions.get(&signal.asset).cloned() {
                Some(trade) => self.close(&signal.asset, trade).await,
                None => {
                    debug!(asset = %signal.asset, "No open position, ignoring sell");
                    Ok(Execution::Ignored)
                }
            },
        }
    }

    async fn symbol_info(&mut self, asset: &AssetPair) -> Result<SymbolInfo, ExecutionError> {
        if let Some(info) = self.symbols.get(asset) {
            return Ok(info.clone());
        }
        let info = self.venue.get_symbol_info(asset).await?;
        debug!(
            asset = %asset,
            tick_size = %info.tick_size,
            step_size = %info.step_size,
            "Cached symbol constraints"
        );
        self.symbols.insert(asset.clone(), info.clone());
        Ok(info)
    }

    /// Quote amount the next buy of `asset` commits. Never zero or negative.
    async fn quote_amount(&self, asset: &AssetPair) -> Result<Decimal, ExecutionError> {
        let account = self.venue.get_account_info().await?;
        let free = account.free_balance(asset.quote());

        let (quote, required, available) = match self.config.sizing {
            TradeSizing::Percent(fraction) => (free * fraction, free * fraction, free),
            TradeSizing::Fixed(amount) => {
                let available = free * FIXED_HEADROOM;
                if amount <= available {
                    (amount, amount, available)
                } else if self.config.reduce {
                    info!(
                        asset = %asset,
                        configured = %amount,
                        available = %available,
                        "Reducing trade volume to available balance"
                    );
                    (available, amount, available)
                } else {
                    return Err(ExecutionError::InsufficientFunds {
                        asset: asset.clone(),
                        required: amount,
                        available,
                    });
                }
            }
        };

        if quote <= Decimal::ZERO {
            return Err(ExecutionError::InsufficientFunds {
                asset: asset.clone(),
                required,
                available,
            });
        }
        Ok(quote)
    }

    /// Builds the buy order for `quote` and returns it with its expected price.
    async fn buy_order(
        &self,
        asset: &AssetPair,
        quote: Decimal,
        symbol: &SymbolInfo,
    ) -> Result<(Order, Decimal), ExecutionError> {
        match self.config.max_slippage {
            None => {
                let book = self.venue.get_order_book(asset).await?;
                let (base, average) = book
                    .buy_volume_and_average_price(quote)
                    .ok_or_else(|| ExecutionError::EmptyOrderBook(asset.clone()))?;
                let quantity = floor_to_step(base, symbol.step_size);
                Ok((Order::market(asset.clone(), Side::Buy, quantity), average))
            }
            Some(slippage) => {
                let ticker = self.venue.get_ticker(asset).await?;
                let limit = floor_to_step(ticker * (Decimal::ONE + slippage), symbol.tick_size);
                if limit <= Decimal::ZERO {
                    return Err(ExecutionError::InvalidPrice {
                        asset: asset.clone(),
                        price: limit,
                    });
                }
                let quantity = floor_to_step(quote / limit, symbol.step_size);
                let order = Order::limit(
                    asset.clone(),
                    Side::Buy,
                    TimeInForce::ImmediateOrCancel,
                    quantity,
                    limit,
                );
                Ok((order, limit))
            }
        }
    }

    async fn open(&mut self, asset: &AssetPair) -> Result<Execution, ExecutionError> {
        let quote = self.quote_amount(asset).await?;
        let symbol = self.symbol_info(asset).await?;
        let (order, expected_price) = self.buy_order(asset, quote, &symbol).await?;

        if order.quantity <= Decimal::ZERO || order.quantity < symbol.min_qty {
            return Err(ExecutionError::ZeroQuantity(asset.clone()));
        }

        if self.config.paper {
            info!(
                asset = %asset,
                quantity = %order.quantity,
                price = %expected_price,
                "Paper buy"
            );
            self.positions.insert(
                asset.clone(),
                OpenTrade::Paper {
                    reference: order.reference,
                    quantity: order.quantity,
                    entry_price: expected_price,
                },
            );
            self.notify(format!(
                "[paper] BUY {} {} @ {} {}",
                order.quantity,
                asset.base(),
                expected_price,
                asset.quote()
            ))
            .await;
            return Ok(Execution::Opened {
                quantity: order.quantity,
                price: expected_price,
            });
        }

        let placed = self
            .venue
            .place_order(&order, Some(&symbol))
            .await
            .map_err(ExecutionError::Order)?;

        if placed.executed_quantity <= Decimal::ZERO && placed.status.is_closed() {
            return Err(ExecutionError::NotFilled {
                asset: asset.clone(),
                status: placed.status,
            });
        }

        let quantity = if placed.executed_quantity > Decimal::ZERO {
            placed.executed_quantity
        } else {
            order.quantity
        };
        let price = average_fill_price(&placed.fills).unwrap_or(expected_price);
        info!(
            asset = %asset,
            quantity = %quantity,
            price = %price,
            status = ?placed.status,
            venue_id = ?placed.reference.venue_id,
            "Bought"
        );

        self.positions
            .insert(asset.clone(), OpenTrade::Live(placed.reference));
        self.notify(format!(
            "BUY {} {} @ {} {}",
            quantity,
            asset.base(),
            price,
            asset.quote()
        ))
        .await;
        Ok(Execution::Opened { quantity, price })
    }

    async fn close(
        &mut self,
        asset: &AssetPair,
        trade: OpenTrade,
    ) -> Result<Execution, ExecutionError> {
        match trade {
            OpenTrade::Paper {
                quantity,
                entry_price,
                ..
            } => {
                self.positions.remove(asset);
                match self.venue.get_ticker(asset).await {
                    Ok(price) => info!(
                        asset = %asset,
                        quantity = %quantity,
                        price = %price,
                        pnl = %((price - entry_price) * quantity),
                        "Paper sell"
                    ),
                    Err(e) => warn!(
                        asset = %asset,
                        quantity = %quantity,
                        error = %e,
                        "Paper sell without exit price"
                    ),
                }
                self.notify(format!("[paper] SELL {} {}", quantity, asset.base()))
                    .await;
                Ok(Execution::Closed {
                    quantity,
                    confirmed: true,
                })
            }
            OpenTrade::Live(reference) => {
                // Nothing has been sold yet, so lookup failures keep the position.
                let opening = self.venue.get_order(&reference).await?;
                let mut fills = self.venue.get_order_fills(&opening).await?;
                if fills.is_empty() {
                    fills = opening.fills.clone();
                }
                let symbol = self.symbol_info(asset).await?;
                let quantity = floor_to_step(net_quantity(&fills, asset.base()), symbol.step_size);

                self.positions.remove(asset);
                if quantity <= Decimal::ZERO {
                    warn!(asset = %asset, "Opening order has no sellable quantity, position cleared");
                    return Ok(Execution::Closed {
                        quantity,
                        confirmed: false,
                    });
                }

                let order = Order::market(asset.clone(), Side::Sell, quantity);
                let confirmed = match self.venue.place_order(&order, Some(&symbol)).await {
                    Ok(placed) => {
                        info!(
                            asset = %asset,
                            quantity = %quantity,
                            status = ?placed.status,
                            "Sold"
                        );
                        true
                    }
                    Err(e) => {
                        // No retry: the position stays cleared locally.
                        warn!(asset = %asset, quantity = %quantity, error = %e, "Failed to close position");
                        false
                    }
                };
                self.notify(format!("SELL {} {}", quantity, asset.base()))
                    .await;
                Ok(Execution::Closed {
                    quantity,
                    confirmed,
                })
            }
        }
    }

    async fn notify(&self, message: String) {
        if let Err(e) = self.notifier.notify(message.as_bytes()).await {
            warn!(notifier = self.notifier.name(), error = %e, "Notification failed");
        }
    }
}

fn average_fill_price(fills: &[Fill]) -> Option<Decimal> {
    let quantity: Decimal = fills.iter().map(|f| f.quantity).sum();
    if quantity <= Decimal::ZERO {
        return None;
    }
    let notional: Decimal = fills.iter().map(|f| f.price * f.quantity).sum();
    Some(notional / quantity)
}
