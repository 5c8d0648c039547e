//! # 行情数据路由控制器
//!
//! 实现 `/assets` 与 `/historical` 两个只读接口，数据均来自本地存储。

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use tradekit_core::common::{Symbol, Timeframe};

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{
    ApiErrorResponse, AssetRow, BarRow, DEFAULT_LIMIT, DEFAULT_SYMBOL, DEFAULT_TIMEFRAME,
    HistoricalQuery,
};

/// 获取已同步的全部资产
#[utoipa::path(
    get,
    path = "/assets",
    tag = "行情 (Prices)",
    responses(
        (status = 200, description = "资产列表", body = Vec<AssetRow>),
        (status = 404, description = "资产表尚未同步", body = ApiErrorResponse),
        (status = 500, description = "存储故障", body = ApiErrorResponse)
    )
)]
pub async fn get_assets(State(state): State<AppState>) -> Result<Json<Vec<AssetRow>>, ApiError> {
    let rows = state.price_service.get_assets().await?;
    Ok(Json(rows))
}

/// 获取已同步的历史 K 线
///
/// 返回指定代码与周期下最新的 `limit` 根 K 线，最新在前，时间格式为 `YYYY-MM-DD HH:MM:SS` (UTC)。
#[utoipa::path(
    get,
    path = "/historical",
    tag = "行情 (Prices)",
    params(HistoricalQuery),
    responses(
        (status = 200, description = "K 线列表", body = Vec<BarRow>),
        (status = 400, description = "代码、周期或条数不合法", body = ApiErrorResponse),
        (status = 404, description = "该代码或周期尚未同步", body = ApiErrorResponse),
        (status = 500, description = "存储故障", body = ApiErrorResponse)
    )
)]
pub async fn get_historical(
    State(state): State<AppState>,
    query: Result<Query<HistoricalQuery>, QueryRejection>,
) -> Result<Json<Vec<BarRow>>, ApiError> {
    let Query(query) = query?;

    let symbol = Symbol::parse(query.symbol.as_deref().unwrap_or(DEFAULT_SYMBOL))?;
    let timeframe: Timeframe = query
        .timeframe
        .as_deref()
        .unwrap_or(DEFAULT_TIMEFRAME)
        .parse()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let rows = state
        .price_service
        .get_historical(symbol, timeframe, Some(limit))
        .await?;
    Ok(Json(rows))
}
