use crate::error::VenueError;
use crate::types::{
    AccountInfo, AssetPair, Fill, Order, OrderBook, OrderInfo, OrderReference, Series, SymbolInfo,
    Timeframe,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// A trading venue as seen by the scheduler and the executor.
///
/// Every call may fail with a transport or venue error; callers decide
/// whether to retry. Implementations own their timeout policy.
#[async_trait]
pub trait VenueDriver: Send + Sync {
    fn name(&self) -> &str;

    async fn get_account_info(&self) -> Result<AccountInfo, VenueError>;

    /// Full candle history, oldest first, last candle still forming.
    async fn get_series(&self, asset: &AssetPair, timeframe: Timeframe)
        -> Result<Series, VenueError>;

    async fn get_order_book(&self, asset: &AssetPair) -> Result<OrderBook, VenueError>;

    // Last traded price
    async fn get_ticker(&self, asset: &AssetPair) -> Result<Decimal, VenueError>;

    async fn get_symbol_info(&self, asset: &AssetPair) -> Result<SymbolInfo, VenueError>;

    async fn place_order(
        &self,
        order: &Order,
        constraints: Option<&SymbolInfo>,
    ) -> Result<OrderInfo, VenueError>;

    async fn get_order(&self, reference: &OrderReference) -> Result<OrderInfo, VenueError>;

    async fn get_order_fills(&self, order: &OrderInfo) -> Result<Vec<Fill>, VenueError>;
}
