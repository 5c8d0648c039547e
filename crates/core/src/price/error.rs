use crate::common::ValidationError;
use thiserror::Error;

/// # Summary
/// 行情获取域错误枚举，覆盖参数校验、网络、解析与数据缺失。
///
/// # Invariants
/// - 网络类错误直接向上传播，适配器内部不做重试。
#[derive(Error, Debug)]
pub enum PriceError {
    // 请求参数不合法，发生在任何网络调用之前
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    // 网络层错误 (连接、超时、鉴权失败、非 2xx 状态码)
    #[error("Network error: {0}")]
    Network(String),
    // 响应体无法解析为预期结构
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Data not found")]
    NotFound,
    #[error("Unknown error: {0}")]
    Unknown(String),
}
