//! 存储文件与数据表的命名规则。
//!
//! 所有名称只由已校验的 `Broker`、`Symbol`、`Timeframe` 推导，SQL 中的标识符一律加双引号。

use std::path::{Path, PathBuf};
use tradekit_core::common::{Symbol, Timeframe, TimeframeUnit};
use tradekit_core::price::entity::Broker;

/// 资产库文件名。
pub const ASSETS_DB: &str = "assets.db";

/// 资产库文件路径 `{root}/assets.db`。
pub fn assets_db_path(root: &Path) -> PathBuf {
    root.join(ASSETS_DB)
}

/// 资产表名，即券商标识 (例如 `Alpaca`)。
pub fn assets_table(broker: Broker) -> &'static str {
    broker.as_str()
}

/// # Summary
/// 代码对应的文件名主体。
///
/// # Invariants
/// - `/` 替换为 `_`；`_` 不是合法的代码字符，因此映射是单射。
pub fn symbol_file_stem(symbol: &Symbol) -> String {
    symbol.as_str().replace('/', "_")
}

/// K 线库文件路径 `{root}/{broker}/{symbol}.db`。
pub fn bars_db_path(root: &Path, broker: Broker, symbol: &Symbol) -> PathBuf {
    root.join(broker.as_str())
        .join(format!("{}.db", symbol_file_stem(symbol)))
}

/// # Summary
/// 周期对应的 K 线表名。
///
/// # Invariants
/// - SQLite 标识符大小写不敏感，`1m` 与 `1M` 会落到同一张表，因此月份使用 `{n}mo` 后缀。
/// - 其余单位直接使用短名称，例如 `tf_4h`。
pub fn bars_table(timeframe: Timeframe) -> String {
    match timeframe.unit() {
        TimeframeUnit::Month => format!("tf_{}mo", timeframe.amount()),
        _ => format!("tf_{}", timeframe.canonical_name()),
    }
}

/// 为 SQL 标识符加双引号，内部的双引号按 SQL 规则转义。
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
