//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use tradekit_service::price::PriceService;

use crate::routes::prices;

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - `price_service` 在服务启动前由 DI 容器注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 行情数据服务
    pub price_service: Arc<PriceService>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tradekit 行情数据 API",
        version = "0.1.0",
        description = "读取本地已同步的券商资产与历史 K 线。",
        license(name = "MIT")
    ),
    tags(
        (name = "行情 (Prices)", description = "资产列表与历史 K 线查询")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// 根据配置的来源列表构建 CORS 层。
///
/// 列表中含 `"*"` 时允许任意来源；否则只允许列出的来源，无法解析的来源会被跳过。
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

/// # Summary
/// 构建完整的 axum 应用路由树。
///
/// # Logic
/// 1. 注册行情路由并自动收集 OpenAPI 文档。
/// 2. 合并 Swagger UI 路由。
/// 3. 应用 CORS 中间件。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `cors_origins` - 允许跨域访问的来源
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(prices::get_assets))
        .routes(routes!(prices::get_historical))
        .with_state(state)
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors_layer(cors_origins))
}

/// 构建路由并在 `bind_addr` 上启动 HTTP 监听，直到进程退出。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"127.0.0.1:8000"`
/// * `cors_origins` - 允许跨域访问的来源
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
    cors_origins: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state, cors_origins);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("tradekit API server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
