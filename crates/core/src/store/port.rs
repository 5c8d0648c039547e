use super::error::StoreError;
use crate::common::{Symbol, Timeframe, ValidationError};
use crate::price::entity::{Asset, Bar, Broker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 保存操作的结果状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Success,
    Error,
}

/// # Summary
/// 保存操作的结果。存储故障被折叠成 `status = Error` 的值返回，而不是抛出。
///
/// # Invariants
/// - `status == Error` 时 `rows_affected == 0` 且 `message` 非空。
/// - `status == Success` 时 `message` 为 `None`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SaveResult {
    pub status: SaveStatus,
    pub message: Option<String>,
    pub rows_affected: u64,
}

impl SaveResult {
    pub fn success(rows_affected: u64) -> Self {
        Self {
            status: SaveStatus::Success,
            message: None,
            rows_affected,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SaveStatus::Error,
            message: Some(message.into()),
            rows_affected: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SaveStatus::Success
    }
}

impl From<Result<u64, StoreError>> for SaveResult {
    fn from(result: Result<u64, StoreError>) -> Self {
        match result {
            Ok(rows) => SaveResult::success(rows),
            Err(e) => SaveResult::error(e.to_string()),
        }
    }
}

/// 历史 K 线保存参数。
#[derive(Debug, Clone)]
pub struct SaveHistoricalParams {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub bars: Vec<Bar>,
}

/// # Summary
/// 历史 K 线读取参数。
///
/// # Invariants
/// - `start` / `end` 均为闭区间边界，二者同时存在时 `end >= start`。
/// - `limit` 若存在则大于 0。
#[derive(Debug, Clone, PartialEq)]
pub struct LoadHistoricalParams {
    symbol: Symbol,
    timeframe: Timeframe,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

impl LoadHistoricalParams {
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Self, ValidationError> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(ValidationError::EndBeforeStart);
            }
        }
        if limit == Some(0) {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(Self {
            symbol,
            timeframe,
            start,
            end,
            limit,
        })
    }

    /// 不带任何过滤条件，读取整张表。
    pub fn all(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            symbol,
            timeframe,
            start: None,
            end: None,
            limit: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

/// # Summary
/// 行情数据存储端口，按券商划分，负责资产表与 K 线表的持久化与读取。
///
/// # Invariants
/// - 物理上每个 (broker, symbol, timeframe) 一张 K 线表，每个 broker 一张资产表。
/// - 保存为整表替换 (drop + recreate)，不做追加或 upsert。
/// - 保存操作永不返回错误，故障通过 `SaveResult` 表达。
#[async_trait]
pub trait PriceRepository: Send + Sync {
    fn broker(&self) -> Broker;

    /// # Summary
    /// 用给定资产整体替换该券商的资产表。
    ///
    /// # Logic
    /// 1. 在单个事务内删除旧表并重建。
    /// 2. 逐行写入资产。
    ///
    /// # Returns
    /// 成功时 `rows_affected` 为写入行数；任何存储故障返回 `status = Error`。
    async fn save_assets(&self, assets: &[Asset]) -> SaveResult;

    /// # Summary
    /// 读取该券商的完整资产表。
    ///
    /// # Returns
    /// 表或文件不存在时返回 `StoreError::NotFound`。
    async fn load_assets(&self) -> Result<Vec<Asset>, StoreError>;

    /// 用给定 K 线整体替换 (broker, symbol, timeframe) 对应的表，约定同 `save_assets`。
    async fn save_historical(&self, params: &SaveHistoricalParams) -> SaveResult;

    /// # Summary
    /// 读取历史 K 线。
    ///
    /// # Logic
    /// 1. 按闭区间 `[start, end]` 过滤 (各自可选)。
    /// 2. 按时间降序排序。
    /// 3. 截取前 `limit` 行，因此 `limit` 总是选中区间内最新的 N 根。
    ///
    /// # Returns
    /// 时间降序的 K 线列表；表或文件不存在时返回 `StoreError::NotFound`。
    async fn load_historical(&self, params: &LoadHistoricalParams)
    -> Result<Vec<Bar>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_save_result_serializes_lowercase_status() {
        let ok = serde_json::to_value(SaveResult::success(3)).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["rows_affected"], 3);
        assert!(ok["message"].is_null());

        let err = SaveResult::error("disk full");
        assert!(!err.is_success());
        assert_eq!(err.rows_affected, 0);
        assert_eq!(serde_json::to_value(&err).unwrap()["status"], "error");
    }

    #[test]
    fn test_save_result_from_store_error() {
        let result: SaveResult = Err(StoreError::Database("locked".into())).into();
        assert_eq!(result.status, SaveStatus::Error);
        assert_eq!(result.message.as_deref(), Some("Database error: locked"));
        assert_eq!(result.rows_affected, 0);
    }

    #[test]
    fn test_load_params_validation() {
        let symbol = Symbol::parse("META").unwrap();
        let day1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let day3 = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

        assert!(
            LoadHistoricalParams::new(symbol.clone(), Timeframe::ONE_DAY, Some(day1), Some(day1), None)
                .is_ok()
        );
        assert_eq!(
            LoadHistoricalParams::new(symbol.clone(), Timeframe::ONE_DAY, Some(day3), Some(day1), None),
            Err(ValidationError::EndBeforeStart)
        );
        assert_eq!(
            LoadHistoricalParams::new(symbol.clone(), Timeframe::ONE_DAY, None, None, Some(0)),
            Err(ValidationError::ZeroLimit)
        );

        let all = LoadHistoricalParams::all(symbol, Timeframe::FOUR_HOURS);
        assert_eq!(all.start(), None);
        assert_eq!(all.limit(), None);
    }
}
