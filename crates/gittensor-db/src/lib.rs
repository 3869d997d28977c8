//! GitTensor 存储层
//!
//! 为验证器评估管道与读取 API 提供 GitHub 贡献数据（仓库、PR、issue、差异、
//! 文件变更、矿工评估结果）到 PostgreSQL 的统一存取。
//!
//! ## 核心职责
//!
//! - **实体映射**：领域对象与数据库行之间的双向转换
//! - **冲突消解**：重复摄取重叠数据时的幂等 upsert 语义（按实体可变性选取策略）
//! - **嵌套读取**：把多表 JOIN 的扁平结果折叠回 PullRequest→PRDiff→FileChange 对象图
//! - **事务边界**：跨表写入（差异及其文件集）在单个事务内整体提交或整体回滚
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `queries`: SQL 语句目录（每个实体固定一组语句与显式冲突策略）
//! - `repository`: 数据库仓储层，每个实体一个仓储
//! - `compose`: 扁平 JOIN 结果到嵌套对象图的组合层
//! - `error`: 错误类型定义

pub mod compose;
pub mod error;
pub mod models;
pub mod queries;
pub mod repository;

pub use compose::{PullRequestDiffRow, fold_pull_request, fold_pull_requests};
pub use error::{Result, StorageError};
pub use models::{FileChange, Issue, MinerEvaluation, PRDiff, PullRequest, Repository};
pub use repository::{
    FileChangesRepository, IssuesRepository, MinerEvaluationsRepository, PrDiffsRepository,
    PullRequestsRepository, RepositoriesRepository,
};
