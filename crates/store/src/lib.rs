//! # `tradekit-store` - 基于 SQLite 文件的行情存储
//!
//! 资产表集中存放于 `{root}/assets.db`，K 线按 "一券商一目录、一代码一库、一周期一表" 存放。

pub mod config;
pub mod naming;
pub mod price;
