//! 配置加载：默认值 → `config/tradekit.toml` (可选) → `TRADEKIT__*` 环境变量。

use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use tradekit_core::config::AppConfig;

/// 配置文件路径的环境变量名
pub const CONFIG_PATH_ENV: &str = "TRADEKIT_CONFIG";
/// 未指定时的配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/tradekit.toml";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 为底。
/// 2. 叠加配置文件 (不存在时跳过)。
/// 3. 叠加 `TRADEKIT__` 前缀、`__` 分隔的环境变量，列表项以逗号分隔。
/// 4. 密钥为空时回落到 `ALPACA_MARKET_DATA_KEY` / `ALPACA_MARKET_DATA_SECRET`。
///
/// # Arguments
/// * `path` - 配置文件路径。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("TRADEKIT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .with_list_parse_key("sync.symbols"),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    Ok(apply_key_fallbacks(app_config, |name| std::env::var(name).ok()))
}

/// 凭据为空时，从 `lookup` 读取 Alpaca 的通用环境变量。
pub fn apply_key_fallbacks(
    mut app_config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    if app_config.alpaca.api_key.is_empty() {
        if let Some(key) = lookup("ALPACA_MARKET_DATA_KEY") {
            app_config.alpaca.api_key = key;
        }
    }
    if app_config.alpaca.api_secret.is_empty() {
        if let Some(secret) = lookup("ALPACA_MARKET_DATA_SECRET") {
            app_config.alpaca.api_secret = secret;
        }
    }
    app_config
}
