use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::tempdir;
use tradekit_core::common::{Symbol, Timeframe, ValidationError};
use tradekit_core::price::entity::{Asset, AssetClass, AssetStatus, Bar, Broker};
use tradekit_core::store::error::StoreError;
use tradekit_core::store::port::{
    LoadHistoricalParams, PriceRepository, SaveHistoricalParams, SaveStatus,
};
use tradekit_store::price::SqlitePriceRepository;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n - 1)
}

fn bar(symbol: &str, timestamp: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1_000.0,
        vwap: close,
        trade_count: Some(42),
    }
}

fn asset(symbol: &str, status: AssetStatus) -> Asset {
    Asset {
        name: format!("{} Inc.", symbol),
        symbol: symbol.to_string(),
        exchange: "NASDAQ".to_string(),
        broker: Broker::Alpaca,
        tradable: status == AssetStatus::Active,
        asset_class: AssetClass::Equity,
        status,
        url_logo: None,
        pairs: None,
    }
}

fn save_params(symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> SaveHistoricalParams {
    SaveHistoricalParams {
        symbol: Symbol::parse(symbol).unwrap(),
        timeframe,
        bars,
    }
}

fn ten_days(symbol: &str) -> Vec<Bar> {
    (1..=10)
        .map(|n| bar(symbol, day(n), 100.0 + f64::from(u32::try_from(n).unwrap())))
        .collect()
}

#[tokio::test]
async fn test_assets_round_trip() {
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());

    let assets = vec![
        asset("MSFT", AssetStatus::Active),
        asset("AAPL", AssetStatus::Active),
        asset("GONE", AssetStatus::Inactive),
    ];
    let result = repo.save_assets(&assets).await;
    assert_eq!(result.status, SaveStatus::Success);
    assert_eq!(result.rows_affected, 3);
    assert!(result.message.is_none());

    // 物理路径位于临时目录下
    assert!(tmp_dir.path().join("assets.db").exists());

    let loaded = repo.load_assets().await.unwrap();
    assert_eq!(loaded.len(), 3);
    let symbols: HashSet<&str> = loaded.iter().map(|a| a.symbol.as_str()).collect();
    assert_eq!(symbols, HashSet::from(["AAPL", "MSFT", "GONE"]));
    // 按代码排序
    assert_eq!(loaded[0].symbol, "AAPL");
    let gone = loaded.iter().find(|a| a.symbol == "GONE").unwrap();
    assert_eq!(gone.status, AssetStatus::Inactive);
    assert!(!gone.tradable);
    assert_eq!(gone.broker, Broker::Alpaca);
}

#[tokio::test]
async fn test_assets_save_replaces_table() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());

    repo.save_assets(&[asset("AAPL", AssetStatus::Active), asset("MSFT", AssetStatus::Active)])
        .await;
    let second = repo.save_assets(&[asset("TSLA", AssetStatus::Active)]).await;
    assert!(second.is_success());

    let loaded = repo.load_assets().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].symbol, "TSLA");
}

#[tokio::test]
async fn test_bars_round_trip() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    let symbol = Symbol::parse("AAPL").unwrap();

    let bars = ten_days("AAPL");
    let result = repo
        .save_historical(&save_params("AAPL", Timeframe::ONE_DAY, bars.clone()))
        .await;
    assert_eq!(result.status, SaveStatus::Success);
    assert_eq!(result.rows_affected, 10);
    assert!(tmp_dir.path().join("Alpaca").join("AAPL.db").exists());

    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(symbol, Timeframe::ONE_DAY))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 10);
    // 最新的在前，字段完整还原
    assert_eq!(loaded[0], bars[9]);
    assert_eq!(loaded[9], bars[0]);
}

#[tokio::test]
async fn test_bars_keep_nanosecond_precision() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    let precise = day(1) + Duration::nanoseconds(123_456_789);

    repo.save_historical(&save_params(
        "AAPL",
        Timeframe::ONE_MINUTE,
        vec![bar("AAPL", precise, 10.0)],
    ))
    .await;

    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(
            Symbol::parse("AAPL").unwrap(),
            Timeframe::ONE_MINUTE,
        ))
        .await
        .unwrap();
    assert_eq!(loaded[0].timestamp, precise);
}

#[tokio::test]
async fn test_bars_save_replaces_table() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());

    repo.save_historical(&save_params("AAPL", Timeframe::FOUR_HOURS, ten_days("AAPL")))
        .await;
    let second = vec![bar("AAPL", day(20), 1.0), bar("AAPL", day(21), 2.0)];
    let result = repo
        .save_historical(&save_params("AAPL", Timeframe::FOUR_HOURS, second.clone()))
        .await;
    assert_eq!(result.rows_affected, 2);

    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(
            Symbol::parse("AAPL").unwrap(),
            Timeframe::FOUR_HOURS,
        ))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().all(|b| b.timestamp >= day(20)));
}

/// # Summary
/// 区间过滤与 "最新优先" 的 limit。
///
/// # Logic
/// 1. 写入 day1..day10 的日线。
/// 2. `[day1, day10]` 返回全部 10 根 (闭区间)。
/// 3. 再加 `limit = 3` 返回 day10, day9, day8。
#[tokio::test]
async fn test_range_filter_and_limit() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    let symbol = Symbol::parse("AAPL").unwrap();
    repo.save_historical(&save_params("AAPL", Timeframe::ONE_DAY, ten_days("AAPL")))
        .await;

    let all = LoadHistoricalParams::new(
        symbol.clone(),
        Timeframe::ONE_DAY,
        Some(day(1)),
        Some(day(10)),
        None,
    )
    .unwrap();
    assert_eq!(repo.load_historical(&all).await.unwrap().len(), 10);

    let latest_three = LoadHistoricalParams::new(
        symbol.clone(),
        Timeframe::ONE_DAY,
        Some(day(1)),
        Some(day(10)),
        Some(3),
    )
    .unwrap();
    let bars = repo.load_historical(&latest_three).await.unwrap();
    let days: Vec<DateTime<Utc>> = bars.iter().map(|b| b.timestamp).collect();
    assert_eq!(days, vec![day(10), day(9), day(8)]);

    // 只有下界
    let tail = LoadHistoricalParams::new(symbol.clone(), Timeframe::ONE_DAY, Some(day(8)), None, None)
        .unwrap();
    assert_eq!(repo.load_historical(&tail).await.unwrap().len(), 3);

    // 只有上界
    let head = LoadHistoricalParams::new(symbol, Timeframe::ONE_DAY, None, Some(day(2)), None).unwrap();
    let bars = repo.load_historical(&head).await.unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].timestamp, day(2));
}

#[tokio::test]
async fn test_load_params_reject_inverted_range() {
    let result = LoadHistoricalParams::new(
        Symbol::parse("AAPL").unwrap(),
        Timeframe::ONE_DAY,
        Some(day(5)),
        Some(day(3)),
        None,
    );
    assert_eq!(result, Err(ValidationError::EndBeforeStart));
}

#[tokio::test]
async fn test_load_before_any_save_is_not_found() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());

    assert!(matches!(repo.load_assets().await, Err(StoreError::NotFound(_))));
    let params = LoadHistoricalParams::all(Symbol::parse("AAPL").unwrap(), Timeframe::ONE_DAY);
    assert!(matches!(
        repo.load_historical(&params).await,
        Err(StoreError::NotFound(_))
    ));

    // 文件已存在，但该周期的表从未创建
    repo.save_historical(&save_params("AAPL", Timeframe::ONE_DAY, ten_days("AAPL")))
        .await;
    let weekly = LoadHistoricalParams::all(Symbol::parse("AAPL").unwrap(), Timeframe::ONE_WEEK);
    assert!(matches!(
        repo.load_historical(&weekly).await,
        Err(StoreError::NotFound(_))
    ));
}

/// 分钟与月份周期只有大小写不同，必须落在不同的表中。
#[tokio::test]
async fn test_minute_and_month_tables_are_separate() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    let symbol = Symbol::parse("AAPL").unwrap();

    repo.save_historical(&save_params("AAPL", Timeframe::ONE_MINUTE, ten_days("AAPL")))
        .await;
    repo.save_historical(&save_params(
        "AAPL",
        Timeframe::ONE_MONTH,
        vec![bar("AAPL", day(1), 5.0)],
    ))
    .await;

    let minutes = repo
        .load_historical(&LoadHistoricalParams::all(symbol.clone(), Timeframe::ONE_MINUTE))
        .await
        .unwrap();
    let months = repo
        .load_historical(&LoadHistoricalParams::all(symbol, Timeframe::ONE_MONTH))
        .await
        .unwrap();
    assert_eq!(minutes.len(), 10);
    assert_eq!(months.len(), 1);
}

#[tokio::test]
async fn test_pair_symbols_use_safe_file_names() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());

    let result = repo
        .save_historical(&save_params(
            "BTC/USD",
            Timeframe::ONE_HOUR,
            vec![bar("BTC/USD", day(1), 42_000.0)],
        ))
        .await;
    assert!(result.is_success());
    assert!(tmp_dir.path().join("Alpaca").join("BTC_USD.db").exists());
}

/// # Summary
/// 存储故障被折叠进 `SaveResult`，不会抛出。
///
/// # Logic
/// 1. 在 .db 文件位置放一个目录，使 SQLite 无法打开。
/// 2. 保存应返回 `status = Error`、`rows_affected = 0` 且带错误信息。
#[tokio::test]
async fn test_save_fault_is_captured() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    std::fs::create_dir_all(tmp_dir.path().join("Alpaca").join("AAPL.db")).unwrap();

    let result = repo
        .save_historical(&save_params("AAPL", Timeframe::ONE_DAY, ten_days("AAPL")))
        .await;
    assert_eq!(result.status, SaveStatus::Error);
    assert_eq!(result.rows_affected, 0);
    assert!(result.message.is_some());
}

/// 写入中途失败时事务回滚，上一次保存的数据保持可读。
#[tokio::test]
async fn test_failed_replace_keeps_previous_table() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    repo.save_historical(&save_params("AAPL", Timeframe::ONE_DAY, ten_days("AAPL")))
        .await;

    // 重复的 (symbol, timestamp) 违反主键
    let duplicated = vec![bar("AAPL", day(30), 1.0), bar("AAPL", day(30), 2.0)];
    let result = repo
        .save_historical(&save_params("AAPL", Timeframe::ONE_DAY, duplicated))
        .await;
    assert_eq!(result.status, SaveStatus::Error);
    assert_eq!(result.rows_affected, 0);

    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(
            Symbol::parse("AAPL").unwrap(),
            Timeframe::ONE_DAY,
        ))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 10);
}

#[tokio::test]
async fn test_concurrent_saves_of_same_table() {
    let tmp_dir = tempdir().unwrap();
    let repo = Arc::new(SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path()));

    let mut handles = Vec::new();
    for round in 0..8u32 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let bars = (0..5)
                .map(|i| bar("AAPL", day(i64::from(round * 10 + i + 1)), f64::from(round)))
                .collect();
            repo.save_historical(&save_params("AAPL", Timeframe::ONE_DAY, bars))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    // 无论哪一次最后写入，表中都恰好是一次完整保存的内容
    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(
            Symbol::parse("AAPL").unwrap(),
            Timeframe::ONE_DAY,
        ))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 5);
    let closes: HashSet<u64> = loaded.iter().map(|b| b.close.to_bits()).collect();
    assert_eq!(closes.len(), 1);
}

/// 超出纳秒可表示范围的过滤边界只起过滤作用，不报错。
#[tokio::test]
async fn test_wide_filter_window_returns_rows_in_range() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    let symbol = Symbol::parse("AAPL")?;
    let saved = repo
        .save_historical(&save_params("AAPL", Timeframe::ONE_DAY, vec![bar("AAPL", day(5), 10.0)]))
        .await;
    assert!(saved.is_success());

    let params = LoadHistoricalParams::new(
        symbol,
        Timeframe::ONE_DAY,
        Some(Utc.with_ymd_and_hms(1600, 1, 1, 0, 0, 0).unwrap()),
        Some(Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap()),
        None,
    )?;
    let loaded = repo.load_historical(&params).await?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].timestamp, day(5));
    Ok(())
}

/// 代码与目标表不一致的 K 线、券商不一致的资产都不会被写入。
#[tokio::test]
async fn test_mismatched_rows_are_rejected() {
    let tmp_dir = tempdir().unwrap();
    let repo = SqlitePriceRepository::with_root(Broker::Alpaca, tmp_dir.path());
    repo.save_historical(&save_params("AAPL", Timeframe::ONE_DAY, ten_days("AAPL")))
        .await;

    let mixed = vec![bar("AAPL", day(20), 1.0), bar("MSFT", day(21), 2.0)];
    let result = repo
        .save_historical(&save_params("AAPL", Timeframe::ONE_DAY, mixed))
        .await;
    assert_eq!(result.status, SaveStatus::Error);
    assert_eq!(result.rows_affected, 0);
    assert!(result.message.unwrap().contains("MSFT"));

    let loaded = repo
        .load_historical(&LoadHistoricalParams::all(
            Symbol::parse("AAPL").unwrap(),
            Timeframe::ONE_DAY,
        ))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 10);

    let mut foreign = asset("BTCUSDT", AssetStatus::Active);
    foreign.broker = Broker::Binance;
    let result = repo
        .save_assets(&[asset("AAPL", AssetStatus::Active), foreign])
        .await;
    assert_eq!(result.status, SaveStatus::Error);
    assert!(matches!(repo.load_assets().await, Err(StoreError::NotFound(_))));
}
