use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tradekit_core::common::time::{RealTimeProvider, TimeProvider};
use tradekit_core::common::{Symbol, Timeframe, TimeframeUnit, ValidationError};
use tradekit_core::config::AlpacaConfig;
use tradekit_core::price::entity::{Asset, AssetClass, AssetStatus, Bar, Broker, Calendar};
use tradekit_core::price::error::PriceError;
use tradekit_core::price::port::{BrokerInfo, HistoricalParams, PriceFetcher};

/// 单页最多返回的 K 线数量 (Alpaca 上限)。
const MAX_PAGE_SIZE: usize = 10_000;

/// # Summary
/// Alpaca 行情与交易日历提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，鉴权头在构造时写入默认 Header。
/// - 参数校验所依据的当前时间来自注入的 `TimeProvider`。
#[derive(Clone)]
pub struct AlpacaProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    config: AlpacaConfig,
    clock: Arc<dyn TimeProvider>,
}

impl AlpacaProvider {
    /// # Summary
    /// 创建一个新的 AlpacaProvider 实例。
    ///
    /// # Logic
    /// 1. 安装 rustls 的 ring 加密后端 (进程内只需一次)。
    /// 2. 将 API Key / Secret 写入默认 Header。
    /// 3. 按配置设置请求超时并构建客户端。
    ///
    /// # Arguments
    /// * `config`: Alpaca 接入配置。
    ///
    /// # Returns
    /// 成功返回 AlpacaProvider；凭据含非法 Header 字符或客户端构建失败时返回 `PriceError`。
    pub fn new(config: AlpacaConfig) -> Result<Self, PriceError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| PriceError::Unknown(format!("Invalid API key: {}", e)))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(&config.api_secret)
                .map_err(|e| PriceError::Unknown(format!("Invalid API secret: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| PriceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            clock: Arc::new(RealTimeProvider),
        })
    }

    /// 替换校验与默认 `end` 所使用的时钟。
    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// # Summary
    /// 发起 GET 请求并将响应体解析为 `T`。
    ///
    /// # Logic
    /// 1. 传输失败与非 2xx 状态码映射为 `PriceError::Network`。
    /// 2. 响应体解析失败映射为 `PriceError::Parse`。
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, PriceError> {
        debug!(url, "Alpaca request");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(url, %status, "Alpaca request failed");
            return Err(PriceError::Network(format!("HTTP {}: {}", status, body.trim())));
        }

        resp.json::<T>()
            .await
            .map_err(|e| PriceError::Parse(e.to_string()))
    }
}

/// 将周期映射为 Alpaca 的 timeframe 参数。
fn alpaca_timeframe(timeframe: Timeframe) -> String {
    let amount = timeframe.amount();
    match timeframe.unit() {
        TimeframeUnit::Minute => format!("{}Min", amount),
        TimeframeUnit::Hour => format!("{}Hour", amount),
        TimeframeUnit::Day => "1Day".to_string(),
        TimeframeUnit::Week => "1Week".to_string(),
        TimeframeUnit::Month => format!("{}Month", amount),
    }
}

/// 股票 K 线接口的路径段；带 `/` 的加密货币对会拆成两个路径段，直接拒绝。
fn stock_path_symbol(symbol: &Symbol) -> Result<&str, PriceError> {
    if symbol.as_str().contains('/') {
        return Err(ValidationError::UnsupportedSymbol(symbol.to_string()).into());
    }
    Ok(symbol.as_str())
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// # Summary
/// `/v2/stocks/{symbol}/bars` 的分页响应。
#[derive(Deserialize, Debug)]
struct BarsPage {
    // 无数据时为 null
    bars: Option<Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

/// `/v2/stocks/{symbol}/bars/latest` 的响应。
#[derive(Deserialize, Debug)]
struct LatestBarResponse {
    bar: Option<AlpacaBar>,
}

/// # Summary
/// Alpaca 原始 K 线。
///
/// # Invariants
/// - `t` 为带时区偏移的 RFC 3339 字符串，转换时统一换算为 UTC。
#[derive(Deserialize, Debug)]
struct AlpacaBar {
    t: DateTime<FixedOffset>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    // 成交笔数
    n: Option<u64>,
    // 成交量加权平均价
    vw: Option<f64>,
}

impl AlpacaBar {
    fn into_bar(self, symbol: &Symbol) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp: self.t.with_timezone(&Utc),
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
            vwap: self.vw.unwrap_or(self.c),
            trade_count: self.n,
        }
    }
}

/// Alpaca 资产条目。
#[derive(Deserialize, Debug)]
struct AlpacaAsset {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    exchange: String,
    class: String,
    status: String,
    tradable: bool,
}

impl AlpacaAsset {
    fn into_asset(self) -> Option<Asset> {
        let asset_class = match self.class.as_str() {
            "us_equity" => AssetClass::Equity,
            "crypto" => AssetClass::Crypto,
            other => {
                warn!(symbol = %self.symbol, class = other, "Skipping asset with unknown class");
                return None;
            }
        };
        Some(Asset {
            name: self.name.unwrap_or_default(),
            symbol: self.symbol,
            exchange: self.exchange,
            broker: Broker::Alpaca,
            tradable: self.tradable,
            asset_class,
            status: AssetStatus::from_broker_status(&self.status),
            url_logo: None,
            pairs: None,
        })
    }
}

/// Alpaca 交易日历条目，`open` / `close` 形如 `"09:30"`。
#[derive(Deserialize, Debug)]
struct AlpacaCalendarDay {
    date: NaiveDate,
    open: String,
    close: String,
}

fn parse_session_time(raw: &str) -> Result<NaiveTime, PriceError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| PriceError::Parse(format!("Invalid session time '{}': {}", raw, e)))
}

#[async_trait]
impl PriceFetcher for AlpacaProvider {
    fn broker(&self) -> Broker {
        Broker::Alpaca
    }

    /// # Summary
    /// 获取全部美股资产。
    ///
    /// # Logic
    /// 1. 请求 `{trading_url}/v2/assets?asset_class=us_equity`。
    /// 2. 未知资产类别跳过并记录告警。
    async fn assets(&self) -> Result<Vec<Asset>, PriceError> {
        let url = format!("{}/v2/assets", self.config.trading_url);
        let raw: Vec<AlpacaAsset> = self
            .get_json(&url, &[("asset_class", "us_equity".to_string())])
            .await?;
        let total = raw.len();
        let assets: Vec<Asset> = raw.into_iter().filter_map(AlpacaAsset::into_asset).collect();
        debug!(total, kept = assets.len(), "Fetched Alpaca assets");
        Ok(assets)
    }

    /// # Summary
    /// 抓取 `[start, end)` 区间内的历史 K 线。
    ///
    /// # Logic
    /// 1. 以注入时钟的当前时间重新校验参数，失败时不发起请求。
    /// 2. 逐页请求，直到没有 `next_page_token` 或已收集 `limit` 根。
    /// 3. Alpaca 的 `end` 为闭区间，因此丢弃时间戳等于 `end` 的 K 线。
    ///
    /// # Arguments
    /// * `params`: 抓取参数，`end` 缺省为当前时间。
    ///
    /// # Returns
    /// 按时间升序排列的 K 线列表。
    async fn historical(&self, params: &HistoricalParams) -> Result<Vec<Bar>, PriceError> {
        let now = self.clock.now();
        params.validate(now)?;

        let symbol = params.symbol();
        let path_symbol = stock_path_symbol(symbol)?;
        let end = params.end().unwrap_or(now);
        let limit = params
            .limit()
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX));
        let url = format!("{}/v2/stocks/{}/bars", self.config.data_url, path_symbol);

        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page_size = limit.map_or(MAX_PAGE_SIZE, |l| {
                l.saturating_sub(bars.len()).min(MAX_PAGE_SIZE)
            });
            let mut query = vec![
                ("timeframe", alpaca_timeframe(params.timeframe())),
                ("start", rfc3339(params.start())),
                ("end", rfc3339(end)),
                ("limit", page_size.to_string()),
                ("adjustment", "raw".to_string()),
            ];
            if let Some(feed) = &self.config.feed {
                query.push(("feed", feed.clone()));
            }
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let page: BarsPage = self.get_json(&url, &query).await?;
            bars.extend(
                page.bars
                    .unwrap_or_default()
                    .into_iter()
                    .map(|b| b.into_bar(symbol))
                    .filter(|b| b.timestamp < end),
            );

            if limit.is_some_and(|l| bars.len() >= l) {
                break;
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        if let Some(l) = limit {
            bars.truncate(l);
        }
        debug!(symbol = %symbol, timeframe = %params.timeframe(), count = bars.len(), "Fetched Alpaca bars");
        Ok(bars)
    }

    async fn latest(&self, symbol: &Symbol) -> Result<Vec<Bar>, PriceError> {
        let url = format!(
            "{}/v2/stocks/{}/bars/latest",
            self.config.data_url,
            stock_path_symbol(symbol)?
        );
        let mut query = Vec::new();
        if let Some(feed) = &self.config.feed {
            query.push(("feed", feed.clone()));
        }
        let resp: LatestBarResponse = self.get_json(&url, &query).await?;
        let bar = resp.bar.ok_or(PriceError::NotFound)?;
        Ok(vec![bar.into_bar(symbol)])
    }
}

#[async_trait]
impl BrokerInfo for AlpacaProvider {
    fn broker(&self) -> Broker {
        Broker::Alpaca
    }

    async fn calendar(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Calendar>, PriceError> {
        let url = format!("{}/v2/calendar", self.config.trading_url);
        let days: Vec<AlpacaCalendarDay> = self
            .get_json(
                &url,
                &[
                    ("start", start.format("%Y-%m-%d").to_string()),
                    ("end", end.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        days.into_iter()
            .map(|day| {
                Ok(Calendar {
                    date: day.date,
                    open: parse_session_time(&day.open)?,
                    close: parse_session_time(&day.close)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_mapping() {
        assert_eq!(alpaca_timeframe(Timeframe::FIVE_MINUTES), "5Min");
        assert_eq!(alpaca_timeframe(Timeframe::FOUR_HOURS), "4Hour");
        assert_eq!(alpaca_timeframe(Timeframe::ONE_DAY), "1Day");
        assert_eq!(alpaca_timeframe(Timeframe::ONE_WEEK), "1Week");
        let quarter = Timeframe::new(3, TimeframeUnit::Month).unwrap();
        assert_eq!(alpaca_timeframe(quarter), "3Month");
    }

    #[test]
    fn test_bar_offset_is_normalized_to_utc() {
        let raw = r#"{"t":"2024-08-26T00:00:00-04:00","o":1.0,"h":2.0,"l":0.5,"c":1.5,"v":1000,"n":12,"vw":1.2}"#;
        let bar: AlpacaBar = serde_json::from_str(raw).unwrap();
        let bar = bar.into_bar(&Symbol::parse("AAPL").unwrap());
        assert_eq!(bar.timestamp.to_rfc3339(), "2024-08-26T04:00:00+00:00");
        assert_eq!(bar.volume, 1000.0);
        assert_eq!(bar.trade_count, Some(12));
    }

    #[test]
    fn test_asset_mapping() {
        let raw = r#"[
            {"symbol":"AAPL","name":"Apple Inc.","exchange":"NASDAQ","class":"us_equity","status":"active","tradable":true},
            {"symbol":"OLD","name":null,"exchange":"OTC","class":"us_equity","status":"inactive","tradable":false},
            {"symbol":"XYZ","name":"Option","exchange":"OPRA","class":"us_option","status":"active","tradable":true}
        ]"#;
        let raw: Vec<AlpacaAsset> = serde_json::from_str(raw).unwrap();
        let assets: Vec<Asset> = raw.into_iter().filter_map(AlpacaAsset::into_asset).collect();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].status, AssetStatus::Active);
        assert_eq!(assets[0].asset_class, AssetClass::Equity);
        assert_eq!(assets[1].name, "");
        assert_eq!(assets[1].status, AssetStatus::Inactive);
    }

    #[test]
    fn test_session_time_formats() {
        assert_eq!(
            parse_session_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_session_time("16:00:00").unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap()
        );
        assert!(matches!(parse_session_time("4pm"), Err(PriceError::Parse(_))));
    }
}
