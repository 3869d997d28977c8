//! Issue 仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::traits::IssuesRepositoryTrait;
use super::values_placeholders;
use crate::error::{Result, classify};
use crate::models::Issue;
use crate::queries;

/// Issue 仓储
///
/// 身份键为 (number, repository_full_name)，经 pr_number 归属到唯一 PR；
/// 标题与关闭状态会随生命周期变化，写入策略为冲突刷新
pub struct IssuesRepository {
    pool: PgPool,
}

impl IssuesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 (number, repository_full_name) 获取 issue；Ok(None) 表示不存在
    pub async fn get(&self, number: i64, repository_full_name: &str) -> Result<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(queries::GET_ISSUE)
            .bind(number)
            .bind(repository_full_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(issue)
    }

    /// 列出某仓库的全部 issue，按创建时间降序
    pub async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<Issue>> {
        let issues = sqlx::query_as::<_, Issue>(queries::GET_ISSUES_BY_REPOSITORY)
            .bind(repository_full_name)
            .fetch_all(&self.pool)
            .await?;

        Ok(issues)
    }

    /// 列出某 PR 关闭的全部 issue
    pub async fn list_by_pull_request(
        &self,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Vec<Issue>> {
        let issues = sqlx::query_as::<_, Issue>(queries::GET_ISSUES_BY_PULL_REQUEST)
            .bind(pr_number)
            .bind(repository_full_name)
            .fetch_all(&self.pool)
            .await?;

        Ok(issues)
    }

    /// 写入 issue，冲突时刷新可变列
    pub async fn set(&self, issue: &Issue) -> Result<()> {
        sqlx::query(queries::SET_ISSUE)
            .bind(issue.number)
            .bind(issue.pr_number)
            .bind(&issue.repository_full_name)
            .bind(&issue.title)
            .bind(issue.created_at)
            .bind(issue.closed_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    number = issue.number,
                    repository = %issue.repository_full_name,
                    "写入 issue 失败: {e}"
                );
                classify("issues", e)
            })?;

        Ok(())
    }

    /// 批量写入 issue
    ///
    /// 整批共享一个事务，全成或全败；成功时返回输入数量
    pub async fn set_bulk(&self, issues: &[Issue], page_size: usize) -> Result<u64> {
        if issues.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in issues.chunks(page_size.max(1)) {
            let sql = format!(
                "{}{}{}",
                queries::BULK_INSERT_ISSUES,
                values_placeholders(chunk.len(), 6),
                queries::BULK_CONFLICT_ISSUES,
            );
            let mut query = sqlx::query(&sql);
            for issue in chunk {
                query = query
                    .bind(issue.number)
                    .bind(issue.pr_number)
                    .bind(&issue.repository_full_name)
                    .bind(&issue.title)
                    .bind(issue.created_at)
                    .bind(issue.closed_at);
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!(count = chunk.len(), "批量写入 issue 失败: {e}");
                classify("issues", e)
            })?;
        }
        tx.commit().await?;

        Ok(issues.len() as u64)
    }
}

#[async_trait]
impl IssuesRepositoryTrait for IssuesRepository {
    async fn get(&self, number: i64, repository_full_name: &str) -> Result<Option<Issue>> {
        self.get(number, repository_full_name).await
    }

    async fn list_by_repository(&self, repository_full_name: &str) -> Result<Vec<Issue>> {
        self.list_by_repository(repository_full_name).await
    }

    async fn list_by_pull_request(
        &self,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Vec<Issue>> {
        self.list_by_pull_request(pr_number, repository_full_name)
            .await
    }

    async fn set(&self, issue: &Issue) -> Result<()> {
        self.set(issue).await
    }

    async fn set_bulk(&self, issues: &[Issue], page_size: usize) -> Result<u64> {
        self.set_bulk(issues, page_size).await
    }
}
