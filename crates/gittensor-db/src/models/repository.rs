//! 代码仓库实体定义

use serde::{Deserialize, Serialize};

/// GitHub 代码仓库
///
/// 以 full_name（owner/name）作为业务主键；其他实体通过该字符串列引用仓库，
/// 入库后身份不再变化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// 仓库名
    pub name: String,
    /// 仓库所有者
    pub owner: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }

    /// 业务主键：owner/name
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
