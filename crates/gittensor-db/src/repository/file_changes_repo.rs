//! 文件变更仓储
//!
//! 文件变更由所属 PR 差异独占；不存在删除单个子行的操作，
//! 重新摄取时以父差异为单位整体替换文件集（先删后插，同一事务内）。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::error;

use super::traits::FileChangesRepositoryTrait;
use super::values_placeholders;
use crate::error::{Result, classify};
use crate::models::FileChange;
use crate::queries;

/// 文件变更仓储
pub struct FileChangesRepository {
    pool: PgPool,
}

impl FileChangesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 按代理主键获取文件变更；Ok(None) 表示不存在
    pub async fn get(&self, id: i64) -> Result<Option<FileChange>> {
        let file_change = sqlx::query_as::<_, FileChange>(queries::GET_FILE_CHANGE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file_change)
    }

    /// 列出某差异名下的全部文件变更，按文件名排序
    pub async fn list_by_pr_diff(&self, pr_diff_id: i64) -> Result<Vec<FileChange>> {
        let file_changes = sqlx::query_as::<_, FileChange>(queries::GET_FILE_CHANGES_BY_PR_DIFF)
            .bind(pr_diff_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(file_changes)
    }

    // ==================== 写入操作 ====================

    /// 整体替换某差异的文件集
    ///
    /// 先删后插在同一事务内完成，全成或全败
    pub async fn set_for_pr_diff(&self, pr_diff_id: i64, files: &[FileChange]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::set_for_pr_diff_in_tx(&mut tx, pr_diff_id, files).await?;
        tx.commit().await?;

        Ok(())
    }

    /// 在既有事务中整体替换某差异的文件集
    ///
    /// 由父差异写入调用，保证父子行共享一个事务边界
    pub async fn set_for_pr_diff_in_tx(
        tx: &mut PgConnection,
        pr_diff_id: i64,
        files: &[FileChange],
    ) -> Result<()> {
        sqlx::query(queries::DELETE_FILE_CHANGES_FOR_PR_DIFF)
            .bind(pr_diff_id)
            .execute(&mut *tx)
            .await?;

        for file in files {
            sqlx::query(queries::INSERT_FILE_CHANGE)
                .bind(pr_diff_id)
                .bind(&file.filename)
                .bind(file.changes)
                .bind(file.additions)
                .bind(file.deletions)
                .bind(&file.status)
                .bind(&file.patch)
                .bind(&file.file_extension)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!(pr_diff_id, filename = %file.filename, "写入文件变更失败: {e}");
                    classify("file_changes", e)
                })?;
        }

        Ok(())
    }

    /// 批量写入文件变更，键为 (pr_diff_id, filename)，冲突时刷新内容
    ///
    /// 整批共享一个事务，全成或全败；成功时返回输入数量
    pub async fn set_bulk(&self, entries: &[(i64, FileChange)], page_size: usize) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in entries.chunks(page_size.max(1)) {
            let sql = format!(
                "{}{}{}",
                queries::BULK_INSERT_FILE_CHANGES,
                values_placeholders(chunk.len(), 8),
                queries::BULK_CONFLICT_FILE_CHANGES,
            );
            let mut query = sqlx::query(&sql);
            for (pr_diff_id, file) in chunk {
                query = query
                    .bind(pr_diff_id)
                    .bind(&file.filename)
                    .bind(file.changes)
                    .bind(file.additions)
                    .bind(file.deletions)
                    .bind(&file.status)
                    .bind(&file.patch)
                    .bind(&file.file_extension);
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!(count = chunk.len(), "批量写入文件变更失败: {e}");
                classify("file_changes", e)
            })?;
        }
        tx.commit().await?;

        Ok(entries.len() as u64)
    }
}

#[async_trait]
impl FileChangesRepositoryTrait for FileChangesRepository {
    async fn get(&self, id: i64) -> Result<Option<FileChange>> {
        self.get(id).await
    }

    async fn list_by_pr_diff(&self, pr_diff_id: i64) -> Result<Vec<FileChange>> {
        self.list_by_pr_diff(pr_diff_id).await
    }

    async fn set_for_pr_diff(&self, pr_diff_id: i64, files: &[FileChange]) -> Result<()> {
        self.set_for_pr_diff(pr_diff_id, files).await
    }

    async fn set_bulk(&self, entries: &[(i64, FileChange)], page_size: usize) -> Result<u64> {
        self.set_bulk(entries, page_size).await
    }
}
