use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 支持的券商 / 行情来源。
///
/// # Invariants
/// - 字符串形式 (`"Alpaca"`, `"Binance"`) 同时用作资产表名与行情文件目录名。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum Broker {
    Alpaca,
    Binance,
}

impl Broker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Broker::Alpaca => "Alpaca",
            Broker::Binance => "Binance",
        }
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Broker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Alpaca" => Ok(Broker::Alpaca),
            "Binance" => Ok(Broker::Binance),
            _ => Err(format!("Unknown broker: {}", s)),
        }
    }
}

/// 资产类别。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum AssetClass {
    Equity,
    Crypto,
    Forex,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "Equity",
            AssetClass::Crypto => "Crypto",
            AssetClass::Forex => "Forex",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Equity" => Ok(AssetClass::Equity),
            "Crypto" => Ok(AssetClass::Crypto),
            "Forex" => Ok(AssetClass::Forex),
            _ => Err(format!("Unknown asset class: {}", s)),
        }
    }
}

/// # Summary
/// 资产在券商处的可交易状态。
///
/// # Invariants
/// - 券商的状态取值各不相同，除明确的 active 外一律归为 `Inactive`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum AssetStatus {
    Active,
    Inactive,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Active => "Active",
            AssetStatus::Inactive => "Inactive",
        }
    }

    /// 将券商原始状态字符串映射为领域状态 (大小写不敏感)。
    pub fn from_broker_status(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("active") {
            AssetStatus::Active
        } else {
            AssetStatus::Inactive
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(AssetStatus::Active),
            "Inactive" => Ok(AssetStatus::Inactive),
            _ => Err(format!("Unknown asset status: {}", s)),
        }
    }
}

/// # Summary
/// 单根 OHLCV K 线。
///
/// # Invariants
/// - `timestamp` 始终为 UTC，精度到纳秒。
/// - 同一张 (broker, symbol, timeframe) 表中 (symbol, timestamp) 唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    // 证券代码
    pub symbol: String,
    // K 线开始时间
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    // 成交量加权平均价
    pub vwap: f64,
    // 成交笔数 (部分来源不提供)
    pub trade_count: Option<u64>,
}

/// # Summary
/// 可交易资产的静态信息。
///
/// # Invariants
/// - `symbol` 在同一券商的资产表内唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    // 资产全称，例如 "Apple Inc."
    pub name: String,
    pub symbol: String,
    // 交易所，例如 "NASDAQ"
    pub exchange: String,
    pub broker: Broker,
    pub tradable: bool,
    pub asset_class: AssetClass,
    pub status: AssetStatus,
    pub url_logo: Option<String>,
    // 交易对描述 (加密货币 / 外汇)
    pub pairs: Option<String>,
}

/// # Summary
/// 交易所的一个交易日。
///
/// # Invariants
/// - `open` / `close` 为交易所当地时间，与券商返回值一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub date: NaiveDate,
    pub open: NaiveTime,
    pub close: NaiveTime,
}
