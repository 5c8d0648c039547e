//! # `tradekit-service` - 行情数据服务
//!
//! 组合 `PriceFetcher` 与 `PriceRepository`：读取路径只访问存储，
//! 同步路径 (`sync_*`) 由调用方显式触发，先抓取再整表保存。

pub mod error;
pub mod price;
pub mod types;
