use crate::common::timeframe::TimeframeUnit;
use thiserror::Error;

/// # Summary
/// 输入校验错误，在任何 I/O 发生之前同步抛出。
///
/// # Invariants
/// - 调用方修正输入后即可重试，属于可恢复错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // 周期数量与单位不匹配
    #[error("Invalid timeframe {amount} {unit:?}: {reason}")]
    Timeframe {
        amount: u32,
        unit: TimeframeUnit,
        reason: &'static str,
    },
    // 无法识别的周期名称
    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),
    #[error("Symbol must not be empty")]
    EmptySymbol,
    #[error("Symbol is too long ({len} > {max})")]
    SymbolTooLong { len: usize, max: usize },
    #[error("Symbol must start with an ASCII letter, got {ch:?}")]
    SymbolInvalidStart { ch: char },
    #[error("Invalid character {ch:?} at position {index} in symbol")]
    SymbolInvalidChar { ch: char, index: usize },
    // 该接口不支持的代码形式 (如股票接口上的 `BTC/USD`)
    #[error("Symbol {0} is not supported by this endpoint")]
    UnsupportedSymbol(String),
    #[error("Start date cannot be in the future")]
    StartInFuture,
    #[error("End date cannot be in the future")]
    EndInFuture,
    #[error("End date must be later than start date")]
    EndBeforeStart,
    #[error("Limit must be greater than zero")]
    ZeroLimit,
}
