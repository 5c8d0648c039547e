//! 测试替身：内存版行情获取器与行情存储，供下游 crate 的集成测试使用。

use crate::common::Symbol;
use crate::price::entity::{Asset, Bar, Broker, Calendar};
use crate::price::error::PriceError;
use crate::price::port::{BrokerInfo, HistoricalParams, PriceFetcher};
use crate::store::error::StoreError;
use crate::store::port::{
    LoadHistoricalParams, PriceRepository, SaveHistoricalParams, SaveResult,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// # Summary
/// 返回固定数据的行情获取器，并记录被调用的次数。
///
/// # Invariants
/// - `historical` 按 `[start, end)` 过滤预置 K 线，再按 `limit` 截取前 N 根。
/// - 设置 `fail_with` 后所有调用都返回网络错误。
pub struct StaticPriceFetcher {
    pub assets: Vec<Asset>,
    pub bars: Vec<Bar>,
    pub calendar: Vec<Calendar>,
    pub fail_with: Option<String>,
    calls: AtomicUsize,
}

impl StaticPriceFetcher {
    pub fn new(assets: Vec<Asset>, bars: Vec<Bar>) -> Self {
        Self {
            assets,
            bars,
            calendar: Vec::new(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(Vec::new(), Vec::new())
        }
    }

    pub fn with_calendar(mut self, calendar: Vec<Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(msg) => Err(PriceError::Network(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PriceFetcher for StaticPriceFetcher {
    fn broker(&self) -> Broker {
        Broker::Alpaca
    }

    async fn assets(&self) -> Result<Vec<Asset>, PriceError> {
        self.enter()?;
        Ok(self.assets.clone())
    }

    async fn historical(&self, params: &HistoricalParams) -> Result<Vec<Bar>, PriceError> {
        self.enter()?;
        let mut bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| b.symbol == params.symbol().as_str())
            .filter(|b| b.timestamp >= params.start())
            .filter(|b| params.end().is_none_or(|end| b.timestamp < end))
            .cloned()
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        if let Some(limit) = params.limit() {
            bars.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(bars)
    }

    async fn latest(&self, symbol: &Symbol) -> Result<Vec<Bar>, PriceError> {
        self.enter()?;
        Ok(self
            .bars
            .iter()
            .filter(|b| b.symbol == symbol.as_str())
            .max_by_key(|b| b.timestamp)
            .cloned()
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl BrokerInfo for StaticPriceFetcher {
    fn broker(&self) -> Broker {
        Broker::Alpaca
    }

    async fn calendar(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Calendar>, PriceError> {
        self.enter()?;
        Ok(self
            .calendar
            .iter()
            .filter(|day| day.date >= start && day.date <= end)
            .cloned()
            .collect())
    }
}

/// # Summary
/// 内存版行情存储，语义与 SQLite 实现一致：整表替换、闭区间过滤、降序后截取。
pub struct MemoryPriceRepository {
    broker: Broker,
    assets: DashMap<Broker, Vec<Asset>>,
    bars: DashMap<String, Vec<Bar>>,
}

impl MemoryPriceRepository {
    pub fn new(broker: Broker) -> Self {
        Self {
            broker,
            assets: DashMap::new(),
            bars: DashMap::new(),
        }
    }

    fn key(symbol: &Symbol, timeframe: crate::common::Timeframe) -> String {
        format!("{}/{}", symbol, timeframe)
    }
}

#[async_trait]
impl PriceRepository for MemoryPriceRepository {
    fn broker(&self) -> Broker {
        self.broker
    }

    async fn save_assets(&self, assets: &[Asset]) -> SaveResult {
        if let Some(other) = assets.iter().find(|a| a.broker != self.broker) {
            return SaveResult::error(format!("Asset {} belongs to {}", other.symbol, other.broker));
        }
        self.assets.insert(self.broker, assets.to_vec());
        SaveResult::success(u64::try_from(assets.len()).unwrap_or(u64::MAX))
    }

    async fn load_assets(&self) -> Result<Vec<Asset>, StoreError> {
        self.assets
            .get(&self.broker)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("assets for {}", self.broker)))
    }

    async fn save_historical(&self, params: &SaveHistoricalParams) -> SaveResult {
        if let Some(other) = params.bars.iter().find(|b| b.symbol != params.symbol.as_str()) {
            return SaveResult::error(format!(
                "Bar for {} cannot be stored under {}",
                other.symbol, params.symbol
            ));
        }
        let key = Self::key(&params.symbol, params.timeframe);
        self.bars.insert(key, params.bars.clone());
        SaveResult::success(u64::try_from(params.bars.len()).unwrap_or(u64::MAX))
    }

    async fn load_historical(
        &self,
        params: &LoadHistoricalParams,
    ) -> Result<Vec<Bar>, StoreError> {
        let key = Self::key(params.symbol(), params.timeframe());
        let stored = self
            .bars
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let mut bars: Vec<Bar> = stored
            .into_iter()
            .filter(|b| params.start().is_none_or(|start| b.timestamp >= start))
            .filter(|b| params.end().is_none_or(|end| b.timestamp <= end))
            .collect();
        bars.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = params.limit() {
            bars.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(bars)
    }
}
