//! # `tradekit-api` - HTTP API 网关
//!
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收前端图表页面的 HTTP 请求
//! - 解析并校验查询参数 (代码、周期、条数)
//! - 调用下层 `PriceService` 读取已保存的资产与 K 线
//! - 将服务层错误映射为 HTTP 状态码

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
