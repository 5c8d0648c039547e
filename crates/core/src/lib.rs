//! # `tradekit-core` - 行情数据访问层的领域核心
//!
//! 定义周期 (Timeframe)、证券代码 (Symbol)、K 线与资产实体，
//! 以及行情获取 (`PriceFetcher`)、行情存储 (`PriceRepository`) 两组端口。
//! 本 crate 不包含任何 I/O，具体适配器位于 `tradekit-feed` 与 `tradekit-store`。

pub mod common;
pub mod config;
pub mod price;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod test_utils;
