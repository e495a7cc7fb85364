// src/connectors/binance.rs
use crate::connectors::messages::{
    RawAccount, RawApiError, RawDepth, RawExchangeInfo, RawKline, RawOrder, RawTickerPrice,
    RawTrade,
};
use crate::connectors::traits::VenueDriver;
use crate::error::{ConfigError, VenueError};
use crate::registry::{plugin_arg, PluginArgs};
use crate::types::{
    AccountInfo, AssetPair, Balance, BookLevel, Candle, Commissions, Fill, Order, OrderBook,
    OrderInfo, OrderReference, OrderStatus, OrderType, Series, Side, SymbolInfo, TimeInForce,
    Timeframe, TimeframeUnit,
};
use crate::utils::precision::round_to_step;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const NAME: &str = "binance";

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const KLINE_LIMIT: u32 = 500;
const DEPTH_LIMIT: u32 = 100;
// Commission values come in basis points
const BASIS_POINTS: i64 = 10_000;

pub struct BinanceClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
}

impl BinanceClient {
    pub fn new(api_key: String, secret_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            secret_key,
            http_client,
            base_rest_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a client from plugin arguments: `apiKey`, `apiSecret` and an
    /// optional `baseUrl` (e.g. the spot testnet).
    pub fn from_args(args: &PluginArgs) -> Result<Self, ConfigError> {
        let api_key = plugin_arg(args, "apiKey")
            .ok_or_else(|| ConfigError::MissingArgument("apiKey".to_string()))?;
        let secret_key = plugin_arg(args, "apiSecret")
            .ok_or_else(|| ConfigError::MissingArgument("apiSecret".to_string()))?;

        let mut client = Self::new(api_key.to_string(), secret_key.to_string());
        if let Some(url) = plugin_arg(args, "baseUrl") {
            client.base_rest_url = url.trim_end_matches('/').to_string();
        }
        Ok(client)
    }

    fn symbol(asset: &AssetPair) -> String {
        format!("{}{}", asset.base(), asset.quote())
    }

    /// Binance only offers a fixed set of kline intervals.
    fn interval(timeframe: Timeframe) -> Result<String, VenueError> {
        let supported = match timeframe.unit() {
            TimeframeUnit::Second => matches!(timeframe.magnitude(), 1),
            TimeframeUnit::Minute => matches!(timeframe.magnitude(), 1 | 3 | 5 | 15 | 30),
            TimeframeUnit::Hour => matches!(timeframe.magnitude(), 1 | 2 | 4 | 6 | 8 | 12),
            TimeframeUnit::Day => matches!(timeframe.magnitude(), 1 | 3),
            TimeframeUnit::Week => matches!(timeframe.magnitude(), 1),
            TimeframeUnit::Month => matches!(timeframe.magnitude(), 1),
        };
        if supported {
            Ok(timeframe.to_string())
        } else {
            Err(VenueError::UnsupportedTimeframe(timeframe))
        }
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> Result<String, VenueError> {
        let mut params = params;
        let timestamp = Utc::now().timestamp_millis().to_string();
        params.push(("timestamp", timestamp));

        let query_string = serde_urlencoded::to_string(&params)
            .map_err(|e| VenueError::Signing(e.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|_| VenueError::Signing("invalid secret key length".to_string()))?;
        mac.update(query_string.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, VenueError> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn send_public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, VenueError> {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        let response = self.http_client.get(&url).query(&params).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VenueError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<RawApiError>(&body) {
                Ok(api) => VenueError::Api {
                    code: api.code,
                    message: api.msg,
                },
                Err(_) => VenueError::Api {
                    code: i64::from(status.as_u16()),
                    message: body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| VenueError::Decode(e.to_string()))
    }

    fn order_info(asset: &AssetPair, raw: RawOrder) -> Result<OrderInfo, VenueError> {
        let client_id = Uuid::parse_str(&raw.client_order_id).map_err(|e| {
            VenueError::Decode(format!("client order id '{}': {}", raw.client_order_id, e))
        })?;
        let millis = raw.transact_time.or(raw.time).unwrap_or_default();

        Ok(OrderInfo {
            reference: OrderReference {
                asset: asset.clone(),
                client_id,
                venue_id: Some(raw.order_id),
            },
            side: parse_side(&raw.side)?,
            order_type: parse_order_type(&raw.order_type),
            status: parse_status(&raw.status)?,
            original_quantity: raw.orig_qty,
            executed_quantity: raw.executed_qty,
            price: raw.price,
            transaction_time: to_time(millis)?,
            fills: raw
                .fills
                .into_iter()
                .map(|f| Fill {
                    price: f.price,
                    quantity: f.qty,
                    commission: f.commission,
                    commission_asset: f.commission_asset.to_uppercase(),
                })
                .collect(),
        })
    }
}

fn to_time(millis: i64) -> Result<DateTime<Utc>, VenueError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| VenueError::Decode(format!("timestamp out of range: {}", millis)))
}

fn parse_side(side: &str) -> Result<Side, VenueError> {
    match side {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(VenueError::Decode(format!("unknown order side '{}'", other))),
    }
}

fn parse_order_type(order_type: &str) -> OrderType {
    match order_type {
        "MARKET" => OrderType::Market,
        _ => OrderType::Limit,
    }
}

fn parse_status(status: &str) -> Result<OrderStatus, VenueError> {
    Ok(match status {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" => OrderStatus::Canceled,
        "PENDING_CANCEL" => OrderStatus::PendingCancel,
        "REJECTED" => OrderStatus::Rejected,
        "EXPIRED" | "EXPIRED_IN_MATCH" => OrderStatus::Expired,
        other => return Err(VenueError::Decode(format!("unknown order status '{}'", other))),
    })
}

fn time_in_force_param(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GoodTillCancel => "GTC",
        TimeInForce::ImmediateOrCancel => "IOC",
        TimeInForce::FillOrKill => "FOK",
    }
}

#[async_trait]
impl VenueDriver for BinanceClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_account_info(&self) -> Result<AccountInfo, VenueError> {
        let raw: RawAccount = self
            .send_signed_request(Method::GET, "/api/v3/account", vec![])
            .await?;

        let bps = |v: i64| Decimal::from(v) / Decimal::from(BASIS_POINTS);
        Ok(AccountInfo {
            commissions: Commissions {
                maker: bps(raw.maker_commission),
                taker: bps(raw.taker_commission),
                buyer: bps(raw.buyer_commission),
                seller: bps(raw.seller_commission),
            },
            balances: raw
                .balances
                .into_iter()
                .map(|b| Balance {
                    asset: b.asset.to_uppercase(),
                    free: b.free,
                    locked: b.locked,
                })
                .collect(),
        })
    }

    async fn get_series(
        &self,
        asset: &AssetPair,
        timeframe: Timeframe,
    ) -> Result<Series, VenueError> {
        let params = vec![
            ("symbol", Self::symbol(asset)),
            ("interval", Self::interval(timeframe)?),
            ("limit", KLINE_LIMIT.to_string()),
        ];
        let raw: Vec<RawKline> = self.send_public_request("/api/v3/klines", params).await?;

        let candles = raw
            .into_iter()
            .map(|k| {
                Ok(Candle {
                    open: k.1,
                    high: k.2,
                    low: k.3,
                    close: k.4,
                    volume: k.5,
                    open_time: to_time(k.0)?,
                    close_time: to_time(k.6)?,
                })
            })
            .collect::<Result<Vec<_>, VenueError>>()?;

        debug!(asset = %asset, timeframe = %timeframe, candles = candles.len(), "Fetched klines");
        Ok(Series::new(asset.clone(), timeframe, candles))
    }

    async fn get_order_book(&self, asset: &AssetPair) -> Result<OrderBook, VenueError> {
        let params = vec![
            ("symbol", Self::symbol(asset)),
            ("limit", DEPTH_LIMIT.to_string()),
        ];
        let raw: RawDepth = self.send_public_request("/api/v3/depth", params).await?;

        let levels = |side: Vec<(Decimal, Decimal)>| -> Vec<BookLevel> {
            side.into_iter()
                .map(|(price, quantity)| BookLevel { price, quantity })
                .collect()
        };
        Ok(OrderBook {
            bids: levels(raw.bids),
            asks: levels(raw.asks),
        })
    }

    async fn get_ticker(&self, asset: &AssetPair) -> Result<Decimal, VenueError> {
        let raw: RawTickerPrice = self
            .send_public_request("/api/v3/ticker/price", vec![("symbol", Self::symbol(asset))])
            .await?;
        Ok(raw.price)
    }

    async fn get_symbol_info(&self, asset: &AssetPair) -> Result<SymbolInfo, VenueError> {
        let symbol = Self::symbol(asset);
        let raw: RawExchangeInfo = self
            .send_public_request("/api/v3/exchangeInfo", vec![("symbol", symbol.clone())])
            .await?;

        let entry = raw
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| VenueError::UnknownSymbol(asset.clone()))?;

        let mut info = SymbolInfo {
            tick_size: Decimal::ZERO,
            step_size: Decimal::ZERO,
            min_qty: Decimal::ZERO,
        };
        for filter in entry.filters {
            match filter.filter_type.as_str() {
                "PRICE_FILTER" => info.tick_size = filter.tick_size.unwrap_or_default(),
                "LOT_SIZE" => {
                    info.step_size = filter.step_size.unwrap_or_default();
                    info.min_qty = filter.min_qty.unwrap_or_default();
                }
                _ => {}
            }
        }
        debug!(
            asset = %asset,
            base = %entry.base_asset,
            quote = %entry.quote_asset,
            tick = %info.tick_size,
            step = %info.step_size,
            "Loaded symbol filters"
        );
        Ok(info)
    }

    async fn place_order(
        &self,
        order: &Order,
        constraints: Option<&SymbolInfo>,
    ) -> Result<OrderInfo, VenueError> {
        let side_str = match order.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let type_str = match order.order_type {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        };

        let mut params = vec![
            ("symbol", Self::symbol(&order.asset)),
            ("side", side_str.to_string()),
            ("type", type_str.to_string()),
            ("quantity", order.quantity.normalize().to_string()),
            ("newClientOrderId", order.reference.to_string()),
            ("newOrderRespType", "FULL".to_string()),
        ];

        if order.order_type == OrderType::Limit {
            let price = order.price.ok_or_else(|| {
                VenueError::Decode("limit order without a price".to_string())
            })?;
            let price = match constraints {
                Some(info) => round_to_step(price, info.tick_size),
                None => price,
            };
            params.push(("price", price.normalize().to_string()));
            let tif = order.time_in_force.unwrap_or(TimeInForce::GoodTillCancel);
            params.push(("timeInForce", time_in_force_param(tif).to_string()));
        }

        info!(
            "🚀 Sending Order: {} {} {} ({}) @ {:?}",
            side_str, order.quantity, order.asset, type_str, order.price
        );

        let raw: RawOrder = self
            .send_signed_request(Method::POST, "/api/v3/order", params)
            .await?;

        Self::order_info(&order.asset, raw)
    }

    async fn get_order(&self, reference: &OrderReference) -> Result<OrderInfo, VenueError> {
        let mut params = vec![("symbol", Self::symbol(&reference.asset))];
        match reference.venue_id {
            Some(id) => params.push(("orderId", id.to_string())),
            None => params.push(("origClientOrderId", reference.client_id.to_string())),
        }

        let raw: RawOrder = self
            .send_signed_request(Method::GET, "/api/v3/order", params)
            .await?;

        Self::order_info(&reference.asset, raw)
    }

    async fn get_order_fills(&self, order: &OrderInfo) -> Result<Vec<Fill>, VenueError> {
        let venue_id = match order.reference.venue_id {
            Some(id) => id,
            None => self.get_order(&order.reference).await?.reference.venue_id.ok_or_else(
                || VenueError::Decode("order lookup returned no order id".to_string()),
            )?,
        };

        let params = vec![
            ("symbol", Self::symbol(&order.reference.asset)),
            ("orderId", venue_id.to_string()),
        ];
        let trades: Vec<RawTrade> = self
            .send_signed_request(Method::GET, "/api/v3/myTrades", params)
            .await?;

        Ok(trades
            .into_iter()
            .filter(|t| t.order_id == venue_id)
            .map(|t| Fill {
                price: t.price,
                quantity: t.qty,
                commission: t.commission,
                commission_asset: t.commission_asset.to_uppercase(),
            })
            .collect())
    }
}
