use crate::error::ServiceError;
use crate::types::{AssetRow, BarRow};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};
use tradekit_core::common::time::{RealTimeProvider, TimeProvider};
use tradekit_core::common::{Symbol, Timeframe};
use tradekit_core::price::port::{HistoricalParams, PriceFetcher};
use tradekit_core::store::port::{
    LoadHistoricalParams, PriceRepository, SaveHistoricalParams, SaveResult,
};

/// # Summary
/// `PriceService` 组合一个行情获取器与一个行情存储，是 HTTP 层唯一的入口。
///
/// # Invariants
/// - 读取只访问存储，缓存缺失时不会回退到券商接口。
/// - 抓取失败向上传播；保存故障保留在返回的 `SaveResult` 中。
pub struct PriceService {
    fetcher: Arc<dyn PriceFetcher>,
    repository: Arc<dyn PriceRepository>,
    /// 计算回溯窗口所用的时钟
    clock: Arc<dyn TimeProvider>,
}

impl PriceService {
    pub fn new(fetcher: Arc<dyn PriceFetcher>, repository: Arc<dyn PriceRepository>) -> Self {
        Self {
            fetcher,
            repository,
            clock: Arc::new(RealTimeProvider),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// 读取已保存的全部资产。
    pub async fn get_assets(&self) -> Result<Vec<AssetRow>, ServiceError> {
        let assets = self.repository.load_assets().await?;
        Ok(assets.into_iter().map(AssetRow::from).collect())
    }

    /// # Summary
    /// 读取已保存的历史 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    /// * `timeframe`: 周期。
    /// * `limit`: 最多返回最新的 N 根，`None` 表示全部。
    ///
    /// # Returns
    /// 最新在前的 K 线行；表不存在时返回 `StoreError::NotFound`。
    pub async fn get_historical(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> Result<Vec<BarRow>, ServiceError> {
        let params = LoadHistoricalParams::new(symbol, timeframe, None, None, limit)?;
        let bars = self.repository.load_historical(&params).await?;
        Ok(bars.into_iter().map(BarRow::from).collect())
    }

    /// # Summary
    /// 从券商抓取全部资产并整表保存。
    ///
    /// # Logic
    /// 1. 调用 `fetcher.assets()`，失败直接返回错误。
    /// 2. 调用 `repository.save_assets()`，保存结果原样返回。
    pub async fn sync_assets(&self) -> Result<SaveResult, ServiceError> {
        let assets = self.fetcher.assets().await?;
        let result = self.repository.save_assets(&assets).await;
        log_save("assets", &result);
        Ok(result)
    }

    /// # Summary
    /// 按参数抓取历史 K 线并整表替换对应的 (symbol, timeframe) 表。
    ///
    /// # Logic
    /// 1. 调用 `fetcher.historical()`，失败直接返回错误。
    /// 2. 将结果保存到存储，保存结果原样返回。
    pub async fn sync_historical(
        &self,
        params: &HistoricalParams,
    ) -> Result<SaveResult, ServiceError> {
        let bars = self.fetcher.historical(params).await?;
        let result = self
            .repository
            .save_historical(&SaveHistoricalParams {
                symbol: params.symbol().clone(),
                timeframe: params.timeframe(),
                bars,
            })
            .await;
        log_save(params.symbol().as_str(), &result);
        Ok(result)
    }

    /// 同步截至当前时间、回溯 `lookback` 的历史 K 线。
    pub async fn sync_recent(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        lookback: Duration,
    ) -> Result<SaveResult, ServiceError> {
        let now = self.clock.now();
        let params = HistoricalParams::new(symbol, timeframe, now - lookback, None, None, now)?;
        self.sync_historical(&params).await
    }
}

fn log_save(subject: &str, result: &SaveResult) {
    if result.is_success() {
        info!(subject, rows = result.rows_affected, "Sync saved");
    } else {
        warn!(
            subject,
            "Sync save failed: {}",
            result.message.as_deref().unwrap_or("unknown error")
        );
    }
}
