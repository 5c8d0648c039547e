use crate::common::{Symbol, Timeframe, ValidationError};
use crate::price::entity::{Asset, Bar, Broker, Calendar};
use crate::price::error::PriceError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// # Summary
/// 历史 K 线抓取参数。
///
/// # Invariants
/// - `start` 早于当前时间；`end` 若存在则早于当前时间且晚于 `start`；`limit` 若存在则大于 0。
/// - 字段私有，只能经 `new` 校验后构造。
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalParams {
    symbol: Symbol,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

impl HistoricalParams {
    /// # Summary
    /// 构造并校验抓取参数。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    /// * `timeframe`: K 线周期。
    /// * `start`: 区间起点 (包含)。
    /// * `end`: 区间终点 (不包含)，`None` 表示截至当前时间。
    /// * `limit`: 最多返回的 K 线数量。
    /// * `now`: 校验所依据的当前时间。
    ///
    /// # Returns
    /// 合法时返回参数，否则返回 `ValidationError`。
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let params = Self {
            symbol,
            timeframe,
            start,
            end,
            limit,
        };
        params.validate(now)?;
        Ok(params)
    }

    /// 以给定的当前时间重新校验。适配器在发起请求前会再调用一次。
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.start >= now {
            return Err(ValidationError::StartInFuture);
        }
        if let Some(end) = self.end {
            if end >= now {
                return Err(ValidationError::EndInFuture);
            }
            if end <= self.start {
                return Err(ValidationError::EndBeforeStart);
            }
        }
        if self.limit == Some(0) {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(())
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn start(&self) -> DateTime<Utc> {
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
/// 行情获取端口，每个券商一个实现。
///
/// # Invariants
/// - 返回的 K 线时间戳一律为 UTC。
/// - 不做本地缓存、不做重试，网络错误原样上抛。
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// 实现所对应的券商。
    fn broker(&self) -> Broker;

    /// # Summary
    /// 获取券商当前资产类别下的全部资产。
    ///
    /// # Logic
    /// 1. 请求券商资产列表。
    /// 2. 映射为统一的 `Asset` 结构，非 active 状态一律视为 `Inactive`。
    ///
    /// # Returns
    /// 成功返回资产列表，失败返回 `PriceError`。
    async fn assets(&self) -> Result<Vec<Asset>, PriceError>;

    /// # Summary
    /// 抓取单个证券在 `[start, end)` 区间内的历史 K 线。
    ///
    /// # Logic
    /// 1. 以当前时间重新校验参数，失败时不发起任何请求。
    /// 2. 请求券商接口，必要时翻页直到数据取完或达到 `limit`。
    /// 3. 时间戳统一转换为 UTC。
    ///
    /// # Arguments
    /// * `params`: 已校验的抓取参数。
    ///
    /// # Returns
    /// 按时间升序排列的 K 线列表。
    async fn historical(&self, params: &HistoricalParams) -> Result<Vec<Bar>, PriceError>;

    /// 获取最新一根 K 线，结果只包含一行。
    async fn latest(&self, symbol: &Symbol) -> Result<Vec<Bar>, PriceError>;
}

/// # Summary
/// 券商交易日历端口。
#[async_trait]
pub trait BrokerInfo: Send + Sync {
    fn broker(&self) -> Broker;

    /// 查询 `[start, end]` 日期范围内的交易日。
    async fn calendar(&self, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Calendar>, PriceError>;

    /// # Summary
    /// 查询 `today` 之后的下一个交易日。
    ///
    /// # Logic
    /// 1. 取 `today` 起 10 天内的日历。
    /// 2. 返回第一个日期严格晚于 `today` 的交易日。
    ///
    /// # Returns
    /// 找不到时返回 `PriceError::NotFound`。
    async fn next_open(&self, today: NaiveDate) -> Result<Calendar, PriceError> {
        let lookahead = today + chrono::Duration::days(10);
        self.calendar(today, lookahead)
            .await?
            .into_iter()
            .find(|day| day.date > today)
            .ok_or(PriceError::NotFound)
    }
}
