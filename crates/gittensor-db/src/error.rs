//! 存储层错误类型
//!
//! 区分「未找到」「存储失败」「完整性冲突」等结果，
//! 点查接口以 `Ok(None)` 表达未命中，不把数据库异常折叠成布尔值。

use thiserror::Error;

/// 存储层错误类型
#[derive(Debug, Error)]
pub enum StorageError {
    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    // === 数据错误 ===
    #[error("记录未找到: {entity} key={key}")]
    NotFound { entity: &'static str, key: String },

    #[error("完整性冲突: {entity} - {detail}")]
    IntegrityViolation {
        entity: &'static str,
        detail: String,
    },

    #[error("缺少必需字段: {entity}.{field}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// 构造未找到错误（供必须命中的调用方使用）
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// 归类底层数据库错误
///
/// 唯一约束/外键冲突映射为 IntegrityViolation，其余保持 Database
pub(crate) fn classify(entity: &'static str, err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            StorageError::IntegrityViolation {
                entity,
                detail: db.message().to_string(),
            }
        }
        _ => StorageError::Database(err),
    }
}
