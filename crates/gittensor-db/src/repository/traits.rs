//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于评估管道与 API 层依赖抽象而非具体实现，支持 mock 测试。
//! `*_in_tx` 静态方法不在接口内：事务内组合由具体仓储负责。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{FileChange, Issue, MinerEvaluation, PRDiff, PullRequest, Repository};

/// 仓库实体仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoriesRepositoryTrait: Send + Sync {
    async fn get(&self, full_name: &str) -> Result<Option<Repository>>;
    async fn get_all(&self) -> Result<Vec<Repository>>;
    async fn set(&self, repository: &Repository) -> Result<()>;
    async fn set_bulk(&self, repositories: &[Repository], page_size: usize) -> Result<u64>;
}

/// Pull Request 仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestsRepositoryTrait: Send + Sync {
    async fn get(&self, number: i64, repository_full_name: &str) -> Result<Option<PullRequest>>;
    async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<PullRequest>>;
    async fn get_with_diffs(
        &self,
        number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PullRequest>>;
    async fn list_by_repository_with_diffs(
        &self,
        repository_full_name: &str,
    ) -> Result<Vec<PullRequest>>;
    async fn set(&self, pull_request: &PullRequest) -> Result<()>;
    async fn set_bulk(&self, pull_requests: &[PullRequest], page_size: usize) -> Result<u64>;
}

/// Issue 仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssuesRepositoryTrait: Send + Sync {
    async fn get(&self, number: i64, repository_full_name: &str) -> Result<Option<Issue>>;
    async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<Issue>>;
    async fn list_by_pull_request(
        &self,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Vec<Issue>>;
    async fn set(&self, issue: &Issue) -> Result<()>;
    async fn set_bulk(&self, issues: &[Issue], page_size: usize) -> Result<u64>;
}

/// PR 差异仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrDiffsRepositoryTrait: Send + Sync {
    async fn get(
        &self,
        evaluation_id: i64,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PRDiff>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<PRDiff>>;
    async fn list_by_evaluation(&self, evaluation_id: i64) -> Result<Vec<PRDiff>>;
    async fn set(&self, diff: &PRDiff, evaluation_id: i64) -> Result<i64>;
    async fn set_bulk(&self, diffs: &[PRDiff], evaluation_id: i64, page_size: usize)
    -> Result<u64>;
}

/// 文件变更仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileChangesRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<FileChange>>;
    async fn list_by_pr_diff(&self, pr_diff_id: i64) -> Result<Vec<FileChange>>;
    async fn set_for_pr_diff(&self, pr_diff_id: i64, files: &[FileChange]) -> Result<()>;
    async fn set_bulk(&self, entries: &[(i64, FileChange)], page_size: usize) -> Result<u64>;
}

/// 矿工评估仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MinerEvaluationsRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<MinerEvaluation>>;
    async fn get_with_prs(&self, id: i64) -> Result<Option<MinerEvaluation>>;
    async fn get_latest_by_uid(&self, uid: i64) -> Result<Option<MinerEvaluation>>;
    async fn list_by_timeframe(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinerEvaluation>>;
    async fn set(&self, evaluation: &MinerEvaluation) -> Result<i64>;
}
