use serde::{Deserialize, Serialize};
use tradekit_core::price::entity::{Asset, Bar};
use utoipa::ToSchema;

/// 对外输出的时间格式 (UTC)。
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// 资产的传输形态，枚举字段以字符串输出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssetRow {
    pub name: String,
    pub symbol: String,
    pub exchange: String,
    /// 例如 "Alpaca"
    pub broker: String,
    pub tradable: bool,
    /// "Equity" / "Crypto" / "Forex"
    pub asset_class: String,
    /// "Active" / "Inactive"
    pub status: String,
    pub url_logo: Option<String>,
    pub pairs: Option<String>,
}

impl From<Asset> for AssetRow {
    fn from(asset: Asset) -> Self {
        Self {
            name: asset.name,
            symbol: asset.symbol,
            exchange: asset.exchange,
            broker: asset.broker.to_string(),
            tradable: asset.tradable,
            asset_class: asset.asset_class.to_string(),
            status: asset.status.to_string(),
            url_logo: asset.url_logo,
            pairs: asset.pairs,
        }
    }
}

/// # Summary
/// K 线的传输形态。
///
/// # Invariants
/// - `timestamp` 为 UTC，格式 `YYYY-MM-DD HH:MM:SS`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BarRow {
    pub symbol: String,
    #[schema(example = "2024-08-26 13:30:00")]
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: f64,
    pub trade_count: Option<u64>,
}

impl From<Bar> for BarRow {
    fn from(bar: Bar) -> Self {
        Self {
            symbol: bar.symbol,
            timestamp: bar.timestamp.format(DATETIME_FORMAT).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            vwap: bar.vwap,
            trade_count: bar.trade_count,
        }
    }
}
