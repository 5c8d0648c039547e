mod logging;
mod settings;
mod startup;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tradekit_api::server::{AppState, start_server};
use tradekit_core::price::entity::Broker;
use tradekit_feed::alpaca::AlpacaProvider;
use tradekit_service::price::PriceService;
use tradekit_store::price::SqlitePriceRepository;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责加载配置、实例化具体实现并通过 `Arc<dyn Trait>` 注入到 `PriceService`。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 设置存储根目录，实例化基础设施层 (Alpaca、SQLite)。
/// 3. 构造应用服务层 (PriceService)。
/// 4. 按配置执行启动同步。
/// 5. 启动 HTTP 服务，直到收到退出信号。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config_path = std::env::var(settings::CONFIG_PATH_ENV)
        .unwrap_or_else(|_| settings::DEFAULT_CONFIG_PATH.to_string());
    let config = settings::load_config(PathBuf::from(&config_path).as_path())?;
    let _log_guard = logging::init(&config.log)?;
    info!("tradekit starting with config {}", config_path);

    // 2. 基础设施层
    tradekit_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));
    let fetcher = Arc::new(AlpacaProvider::new(config.alpaca.clone())?);
    let repository = Arc::new(SqlitePriceRepository::new(Broker::Alpaca));

    // 3. 应用服务层
    let price_service = Arc::new(PriceService::new(fetcher, repository));

    // 4. 启动同步
    if config.sync.on_startup {
        startup::run(&price_service, &config.sync).await;
    }

    // 5. HTTP 服务
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    start_server(
        AppState { price_service },
        &bind_addr,
        &config.server.cors_origins,
    )
    .await?;

    info!("tradekit stopped");
    Ok(())
}
