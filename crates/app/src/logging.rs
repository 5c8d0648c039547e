//! 全局日志初始化：终端输出，可选按天滚动的文件输出。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tradekit_core::config::LogConfig;

/// 滚动日志的文件名前缀
const LOG_FILE_PREFIX: &str = "tradekit.log";

/// # Summary
/// 安装全局 tracing subscriber。
///
/// # Logic
/// 1. `RUST_LOG` 存在时作为过滤规则，否则使用 `config.level`，两者都无法解析时退回 `info`。
/// 2. 始终输出到终端。
/// 3. 配置了 `dir` 时额外写入 `dir/tradekit.log.YYYY-MM-DD`。
///
/// # Returns
/// 文件输出的后台写入守卫，必须持有到进程退出，否则尾部日志会丢失。
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, TryInitError> {
    let (filter, invalid_level) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match EnvFilter::try_new(&config.level) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new("info"), Some(e)),
        },
    };

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;

    if let Some(e) = invalid_level {
        tracing::warn!("Invalid log level {:?} ({}), using info", config.level, e);
    }
    Ok(guard)
}
