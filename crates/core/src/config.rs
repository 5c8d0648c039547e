use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub alpaca: AlpacaConfig,
    pub sync: SyncConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    // 允许跨域访问的前端地址
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

/// # Summary
/// Alpaca 接入配置。
///
/// # Invariants
/// - `data_url` 用于行情接口，`trading_url` 用于资产与交易日历接口。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub api_secret: String,
    pub data_url: String,
    pub trading_url: String,
    // 行情源 ("iex" / "sip")，为空时由 Alpaca 按账户权限决定
    pub feed: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            data_url: "https://data.alpaca.markets".to_string(),
            trading_url: "https://paper-api.alpaca.markets".to_string(),
            feed: None,
            timeout_secs: 10,
        }
    }
}

/// 启动时的数据同步配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub on_startup: bool,
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub lookback_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_startup: false,
            symbols: vec!["AAPL".to_string()],
            timeframe: "4h".to_string(),
            lookback_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // EnvFilter 语法，RUST_LOG 存在时以 RUST_LOG 为准
    pub level: String,
    // 设置后额外写入按天滚动的日志文件
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}
