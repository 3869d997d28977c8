//! 领域模型定义
//!
//! 包含贡献数据的所有核心实体：仓库、PR、issue、差异、文件变更、矿工评估。
//! 实体只持有数据与派生计算，不做任何 I/O；
//! 跨实体引用一律使用业务键字符串（repository full_name），不共享对象。

pub mod diff;
pub mod evaluation;
pub mod pull_request;
pub mod repository;

// 重新导出常用类型
pub use diff::{FileChange, PRDiff};
pub use evaluation::MinerEvaluation;
pub use pull_request::{Issue, PullRequest};
pub use repository::Repository;
