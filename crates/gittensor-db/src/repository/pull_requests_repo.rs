//! Pull Request 仓储
//!
//! 提供 PR 的点查、按仓库列举与带差异的嵌套读取

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::traits::PullRequestsRepositoryTrait;
use super::values_placeholders;
use crate::compose::{PullRequestDiffRow, fold_pull_request, fold_pull_requests};
use crate::error::{Result, classify};
use crate::models::PullRequest;
use crate::queries;

/// Pull Request 仓储
///
/// 身份键为 (number, repository_full_name)；
/// PR 元数据会在首次摄取后合法变化（改标题、迟到的合并），写入策略为冲突刷新
pub struct PullRequestsRepository {
    pool: PgPool,
}

impl PullRequestsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 按 (number, repository_full_name) 获取 PR；Ok(None) 表示不存在
    pub async fn get(
        &self,
        number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PullRequest>> {
        let pull_request = sqlx::query_as::<_, PullRequest>(queries::GET_PULL_REQUEST)
            .bind(number)
            .bind(repository_full_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pull_request)
    }

    /// 列出某仓库的全部 PR，按合并时间降序
    pub async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<PullRequest>> {
        let pull_requests =
            sqlx::query_as::<_, PullRequest>(queries::GET_PULL_REQUESTS_BY_REPOSITORY)
                .bind(repository_full_name)
                .fetch_all(&self.pool)
                .await?;

        Ok(pull_requests)
    }

    /// 获取 PR 及其差异与文件变更
    ///
    /// 单条 JOIN 一次取回嵌套数据，由组合层折叠；
    /// 差异存在但没有文件时返回空 files 集合，而不是缺失差异
    pub async fn get_with_diffs(
        &self,
        number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PullRequest>> {
        let rows = sqlx::query_as::<_, PullRequestDiffRow>(queries::GET_PULL_REQUEST_WITH_DIFFS)
            .bind(number)
            .bind(repository_full_name)
            .fetch_all(&self.pool)
            .await?;

        Ok(fold_pull_request(&rows))
    }

    /// 列出某仓库的全部 PR 及其差异与文件变更
    ///
    /// 大仓库下结果集可能很大，调用方自行考虑分页
    pub async fn list_by_repository_with_diffs(
        &self,
        repository_full_name: &str,
    ) -> Result<Vec<PullRequest>> {
        let rows = sqlx::query_as::<_, PullRequestDiffRow>(
            queries::GET_PULL_REQUESTS_BY_REPOSITORY_WITH_DIFFS,
        )
        .bind(repository_full_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_pull_requests(rows))
    }

    // ==================== 写入操作 ====================

    /// 写入 PR，冲突时刷新可变列
    pub async fn set(&self, pull_request: &PullRequest) -> Result<()> {
        sqlx::query(queries::SET_PULL_REQUEST)
            .bind(pull_request.number)
            .bind(pull_request.repository_full_name())
            .bind(&pull_request.title)
            .bind(pull_request.merged_at)
            .bind(pull_request.created_at)
            .bind(pull_request.additions)
            .bind(pull_request.deletions)
            .bind(pull_request.commits)
            .bind(&pull_request.author_login)
            .bind(&pull_request.merged_by_login)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    number = pull_request.number,
                    repository = %pull_request.repository_full_name(),
                    "写入 PR 失败: {e}"
                );
                classify("pull_requests", e)
            })?;

        Ok(())
    }

    /// 批量写入 PR
    ///
    /// 整批共享一个事务，全成或全败；成功时返回输入数量
    pub async fn set_bulk(&self, pull_requests: &[PullRequest], page_size: usize) -> Result<u64> {
        if pull_requests.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in pull_requests.chunks(page_size.max(1)) {
            let sql = format!(
                "{}{}{}",
                queries::BULK_INSERT_PULL_REQUESTS,
                values_placeholders(chunk.len(), 10),
                queries::BULK_CONFLICT_PULL_REQUESTS,
            );
            let mut query = sqlx::query(&sql);
            for pull_request in chunk {
                query = query
                    .bind(pull_request.number)
                    .bind(pull_request.repository_full_name())
                    .bind(&pull_request.title)
                    .bind(pull_request.merged_at)
                    .bind(pull_request.created_at)
                    .bind(pull_request.additions)
                    .bind(pull_request.deletions)
                    .bind(pull_request.commits)
                    .bind(&pull_request.author_login)
                    .bind(&pull_request.merged_by_login);
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!(count = chunk.len(), "批量写入 PR 失败: {e}");
                classify("pull_requests", e)
            })?;
        }
        tx.commit().await?;

        Ok(pull_requests.len() as u64)
    }
}

#[async_trait]
impl PullRequestsRepositoryTrait for PullRequestsRepository {
    async fn get(&self, number: i64, repository_full_name: &str) -> Result<Option<PullRequest>> {
        self.get(number, repository_full_name).await
    }

    async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<PullRequest>> {
        self.list_by_repository(repository_full_name).await
    }

    async fn get_with_diffs(
        &self,
        number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PullRequest>> {
        self.get_with_diffs(number, repository_full_name).await
    }

    async fn list_by_repository_with_diffs(
        &self,
        repository_full_name: &str,
    ) -> Result<Vec<PullRequest>> {
        self.list_by_repository_with_diffs(repository_full_name)
            .await
    }

    async fn set(&self, pull_request: &PullRequest) -> Result<()> {
        self.set(pull_request).await
    }

    async fn set_bulk(&self, pull_requests: &[PullRequest], page_size: usize) -> Result<u64> {
        self.set_bulk(pull_requests, page_size).await
    }
}
