//! # `tradekit-feed` - 券商行情适配器
//!
//! 目前只有 Alpaca 一个实现，同时提供 `PriceFetcher` 与 `BrokerInfo`。

pub mod alpaca;
