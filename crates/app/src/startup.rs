//! 启动时的数据同步。

use chrono::Duration;
use tracing::{error, info, warn};
use tradekit_core::common::{Symbol, Timeframe};
use tradekit_core::config::SyncConfig;
use tradekit_service::price::PriceService;

/// 一次启动同步的汇总
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// # Summary
/// 启动时同步资产与配置中的各代码历史 K 线。
///
/// # Invariants
/// - 单个代码失败只记录日志，不影响其余代码，也不阻止服务启动。
///
/// # Logic
/// 1. 同步资产列表。
/// 2. 解析配置的周期，非法时跳过全部 K 线同步。
/// 3. 逐个代码同步最近 `lookback_days` 天的 K 线。
pub async fn run(service: &PriceService, config: &SyncConfig) -> SyncSummary {
    let mut summary = SyncSummary::default();

    match service.sync_assets().await {
        Ok(result) if result.is_success() => summary.succeeded += 1,
        Ok(_) => summary.failed += 1,
        Err(e) => {
            error!("Startup asset sync failed: {}", e);
            summary.failed += 1;
        }
    }

    let timeframe: Timeframe = match config.timeframe.parse() {
        Ok(tf) => tf,
        Err(e) => {
            error!("Invalid sync timeframe {:?}: {}", config.timeframe, e);
            summary.failed += config.symbols.len();
            return summary;
        }
    };
    let lookback = Duration::days(i64::from(config.lookback_days));

    for raw in &config.symbols {
        let symbol = match Symbol::parse(raw) {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!("Skipping invalid sync symbol {:?}: {}", raw, e);
                summary.failed += 1;
                continue;
            }
        };

        match service.sync_recent(symbol, timeframe, lookback).await {
            Ok(result) if result.is_success() => summary.succeeded += 1,
            Ok(_) => summary.failed += 1,
            Err(e) => {
                error!(symbol = %raw, "Startup bar sync failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Startup sync finished"
    );
    summary
}
