//! # DTO (Data Transfer Object) 层
//!
//! 资产与 K 线的输出结构直接复用 `tradekit_service::types` 中的行类型，
//! 本模块只定义查询参数与错误响应体。所有 DTO 必须派生 `utoipa::ToSchema` 以进入 Swagger 文档。

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub use tradekit_service::types::{AssetRow, BarRow};

/// `/historical` 默认查询的代码
pub const DEFAULT_SYMBOL: &str = "AAPL";
/// `/historical` 默认查询的周期
pub const DEFAULT_TIMEFRAME: &str = "4h";
/// `/historical` 默认返回的条数
pub const DEFAULT_LIMIT: u32 = 100;

/// 历史 K 线查询参数，缺省时回落到 AAPL / 4h / 100。
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoricalQuery {
    /// 证券代码
    #[param(example = "AAPL")]
    pub symbol: Option<String>,
    /// 周期短名称，例如 "1m"、"4h"、"1d"、"1M"
    #[param(example = "4h")]
    pub timeframe: Option<String>,
    /// 返回最新的 N 根 K 线
    #[param(example = 100)]
    pub limit: Option<u32>,
}

/// 失败响应体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
