use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::warn;

/// 未调用 `set_root_dir` 时使用的数据目录
pub const DEFAULT_ROOT_DIR: &str = "data";

static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// 设置行情库的数据根目录 (`assets.db` 与各券商子目录所在位置)。
///
/// 只有第一次调用生效，之后的调用记录告警后忽略。
pub fn set_root_dir(path: PathBuf) {
    if let Err(rejected) = ROOT_DIR.set(path) {
        warn!(path = %rejected.display(), "Store root dir already set, ignoring");
    }
}

pub fn get_root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
}
