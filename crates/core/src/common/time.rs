use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// # Summary
/// 当前时间的供给接口。
/// 请求参数中 "不得晚于当前时间" 一类的校验都以它为准，测试可替换为固定时钟。
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 可手动拨动的固定时钟。
///
/// # Invariants
/// - 读写通过 `RwLock` 保护；锁中毒时沿用内部保存的时间值。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut guard = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = new_time;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
