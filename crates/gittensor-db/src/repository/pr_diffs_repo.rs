//! PR 差异仓储
//!
//! 差异与其文件集的持久化由本仓储统筹：写入差异时一并写入全量文件集，
//! 两者共享一个事务，整体提交或整体回滚。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use tracing::error;

use super::file_changes_repo::FileChangesRepository;
use super::traits::PrDiffsRepositoryTrait;
use super::values_placeholders;
use crate::error::{Result, classify};
use crate::models::PRDiff;
use crate::queries;

/// PR 差异仓储
///
/// 存储身份为组合键 (miner_evaluation_id, pr_number, repository_full_name)；
/// 得分由评估重算产生，写入策略为冲突刷新
pub struct PrDiffsRepository {
    pool: PgPool,
    file_changes: FileChangesRepository,
}

impl PrDiffsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            file_changes: FileChangesRepository::new(pool.clone()),
            pool,
        }
    }

    // ==================== 查询操作 ====================

    /// 按组合键获取差异（含文件集）；Ok(None) 表示不存在
    pub async fn get(
        &self,
        evaluation_id: i64,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PRDiff>> {
        let diff = sqlx::query_as::<_, PRDiff>(queries::GET_PR_DIFF)
            .bind(evaluation_id)
            .bind(pr_number)
            .bind(repository_full_name)
            .fetch_optional(&self.pool)
            .await?;

        self.attach_files(diff).await
    }

    /// 按代理主键获取差异（含文件集）；Ok(None) 表示不存在
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PRDiff>> {
        let diff = sqlx::query_as::<_, PRDiff>(queries::GET_PR_DIFF_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.attach_files(diff).await
    }

    /// 列出某次评估的全部差异（各含文件集），按得分降序
    pub async fn list_by_evaluation(&self, evaluation_id: i64) -> Result<Vec<PRDiff>> {
        let mut diffs = sqlx::query_as::<_, PRDiff>(queries::GET_PR_DIFFS_BY_EVALUATION)
            .bind(evaluation_id)
            .fetch_all(&self.pool)
            .await?;

        for diff in &mut diffs {
            if let Some(id) = diff.id {
                diff.files = self.file_changes.list_by_pr_diff(id).await?;
            }
        }

        Ok(diffs)
    }

    // ==================== 写入操作 ====================

    /// 写入差异及其全量文件集，返回差异的代理主键
    ///
    /// 差异行与文件行共享一个事务：文件写入失败时差异一并回滚，
    /// 不会留下没有文件集的半成品差异
    pub async fn set(&self, diff: &PRDiff, evaluation_id: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = Self::set_in_tx(&mut tx, diff, evaluation_id).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// 在既有事务中写入差异及其全量文件集
    ///
    /// 由评估写入调用，整次评估共享一个事务边界
    pub async fn set_in_tx(
        tx: &mut PgConnection,
        diff: &PRDiff,
        evaluation_id: i64,
    ) -> Result<i64> {
        let row = sqlx::query(queries::SET_PR_DIFF)
            .bind(diff.pr_number)
            .bind(&diff.repository_full_name)
            .bind(evaluation_id)
            .bind(diff.earned_score)
            .bind(diff.total_changes())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(
                    pr_number = diff.pr_number,
                    repository = %diff.repository_full_name,
                    evaluation_id,
                    "写入 PR 差异失败: {e}"
                );
                classify("pr_diffs", e)
            })?;
        let id: i64 = row.get("id");

        FileChangesRepository::set_for_pr_diff_in_tx(tx, id, &diff.files).await?;

        Ok(id)
    }

    /// 批量写入差异元数据
    ///
    /// 只写差异行，文件集不随批量路径写入（逐个 set 才携带文件）。
    /// 整批共享一个事务，全成或全败；成功时返回输入数量。
    pub async fn set_bulk(
        &self,
        diffs: &[PRDiff],
        evaluation_id: i64,
        page_size: usize,
    ) -> Result<u64> {
        if diffs.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in diffs.chunks(page_size.max(1)) {
            let sql = format!(
                "{}{}{}",
                queries::BULK_INSERT_PR_DIFFS,
                values_placeholders(chunk.len(), 5),
                queries::BULK_CONFLICT_PR_DIFFS,
            );
            let mut query = sqlx::query(&sql);
            for diff in chunk {
                query = query
                    .bind(diff.pr_number)
                    .bind(&diff.repository_full_name)
                    .bind(evaluation_id)
                    .bind(diff.earned_score)
                    .bind(diff.total_changes());
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!(count = chunk.len(), evaluation_id, "批量写入 PR 差异失败: {e}");
                classify("pr_diffs", e)
            })?;
        }
        tx.commit().await?;

        Ok(diffs.len() as u64)
    }

    /// 查询结果存在时补全文件集
    async fn attach_files(&self, diff: Option<PRDiff>) -> Result<Option<PRDiff>> {
        let Some(mut diff) = diff else {
            return Ok(None);
        };

        if let Some(id) = diff.id {
            diff.files = self.file_changes.list_by_pr_diff(id).await?;
        }

        Ok(Some(diff))
    }
}

#[async_trait]
impl PrDiffsRepositoryTrait for PrDiffsRepository {
    async fn get(
        &self,
        evaluation_id: i64,
        pr_number: i64,
        repository_full_name: &str,
    ) -> Result<Option<PRDiff>> {
        self.get(evaluation_id, pr_number, repository_full_name)
            .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PRDiff>> {
        self.get_by_id(id).await
    }

    async fn list_by_evaluation(&self, evaluation_id: i64) -> Result<Vec<PRDiff>> {
        self.list_by_evaluation(evaluation_id).await
    }

    async fn set(&self, diff: &PRDiff, evaluation_id: i64) -> Result<i64> {
        self.set(diff, evaluation_id).await
    }

    async fn set_bulk(&self, diffs: &[PRDiff], evaluation_id: i64, page_size: usize) -> Result<u64> {
        self.set_bulk(diffs, evaluation_id, page_size).await
    }
}
