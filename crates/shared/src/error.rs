//! 基础设施错误类型
//!
//! 定义配置加载与数据库连接共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum SharedError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, SharedError>;

impl SharedError {
    /// 是否为可重试错误
    ///
    /// 连接类故障可以重试，配置错误重试没有意义
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
