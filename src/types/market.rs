// src/types/market.rs
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commissions {
    pub maker: Decimal,
    pub taker: Decimal,
    pub buyer: Decimal,
    pub seller: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountInfo {
    pub commissions: Commissions,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// Free balance of `asset`, zero when the account does not hold it.
    pub fn free_balance(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Walks the asks to spend `quote_amount` and returns the base quantity
    /// bought with its volume-weighted average price.
    ///
    /// If the book is too thin the whole visible ask side is taken. Returns
    /// `None` when nothing can be bought.
    pub fn buy_volume_and_average_price(&self, quote_amount: Decimal) -> Option<(Decimal, Decimal)> {
        let mut remaining = quote_amount;
        let mut base = Decimal::ZERO;
        let mut notional = Decimal::ZERO;
        let mut levels_used = 0usize;
        let mut last_price = Decimal::ZERO;

        for level in &self.asks {
            if remaining <= Decimal::ZERO {
                break;
            }
            if level.price <= Decimal::ZERO || level.quantity <= Decimal::ZERO {
                continue;
            }
            levels_used += 1;
            last_price = level.price;

            let level_notional = level.price * level.quantity;
            if level_notional >= remaining {
                base += remaining / level.price;
                notional += remaining;
                remaining = Decimal::ZERO;
            } else {
                base += level.quantity;
                notional += level_notional;
                remaining -= level_notional;
            }
        }

        if base.is_zero() {
            return None;
        }
        // A fill confined to one level trades at exactly that level's price.
        let average = if levels_used == 1 {
            last_price
        } else {
            notional / base
        };
        Some((base, average))
    }
}

/// Venue trading constraints for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub tick_size: Decimal,
    pub step_size: Decimal,
    pub min_qty: Decimal,
}
