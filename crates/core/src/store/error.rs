use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、读写失败与数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 保存操作不会抛出该错误，而是将其折叠进 `SaveResult`。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败 (连接、写入、建表)
    #[error("Database error: {0}")]
    Database(String),
    /// 目标文件或数据表从未创建
    #[error("Not found: {0}")]
    NotFound(String),
    /// 已落盘的数据无法还原为领域实体
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// 初始化存储失败
    #[error("Initialization error: {0}")]
    InitError(String),
}
