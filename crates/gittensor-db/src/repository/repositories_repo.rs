//! 仓库实体仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::traits::RepositoriesRepositoryTrait;
use super::values_placeholders;
use crate::error::{Result, classify};
use crate::models::Repository;
use crate::queries;

/// 仓库实体仓储
///
/// full_name 为业务主键；仓库身份不可变，重复写入是幂等空操作
pub struct RepositoriesRepository {
    pool: PgPool,
}

impl RepositoriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 full_name 获取仓库；Ok(None) 表示不存在
    pub async fn get(&self, full_name: &str) -> Result<Option<Repository>> {
        let repository = sqlx::query_as::<_, Repository>(queries::GET_REPOSITORY)
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(repository)
    }

    /// 列出全部仓库，按 full_name 排序
    pub async fn get_all(&self) -> Result<Vec<Repository>> {
        let repositories = sqlx::query_as::<_, Repository>(queries::GET_ALL_REPOSITORIES)
            .fetch_all(&self.pool)
            .await?;

        Ok(repositories)
    }

    /// 写入仓库
    pub async fn set(&self, repository: &Repository) -> Result<()> {
        sqlx::query(queries::SET_REPOSITORY)
            .bind(repository.full_name())
            .bind(&repository.name)
            .bind(&repository.owner)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(full_name = %repository.full_name(), "写入仓库失败: {e}");
                classify("repositories", e)
            })?;

        Ok(())
    }

    /// 批量写入仓库
    ///
    /// 每页最多 page_size 行一次往返，整批共享一个事务；
    /// 任一页失败整体回滚并返回错误，成功时返回输入数量。
    /// 与循环调用 set 不同，这里不存在部分成功。
    pub async fn set_bulk(&self, repositories: &[Repository], page_size: usize) -> Result<u64> {
        if repositories.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for chunk in repositories.chunks(page_size.max(1)) {
            let sql = format!(
                "{}{}{}",
                queries::BULK_INSERT_REPOSITORIES,
                values_placeholders(chunk.len(), 3),
                queries::BULK_CONFLICT_REPOSITORIES,
            );
            let mut query = sqlx::query(&sql);
            for repository in chunk {
                query = query
                    .bind(repository.full_name())
                    .bind(&repository.name)
                    .bind(&repository.owner);
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!(count = chunk.len(), "批量写入仓库失败: {e}");
                classify("repositories", e)
            })?;
        }
        tx.commit().await?;

        Ok(repositories.len() as u64)
    }
}

#[async_trait]
impl RepositoriesRepositoryTrait for RepositoriesRepository {
    async fn get(&self, full_name: &str) -> Result<Option<Repository>> {
        self.get(full_name).await
    }

    async fn get_all(&self) -> Result<Vec<Repository>> {
        self.get_all().await
    }

    async fn set(&self, repository: &Repository) -> Result<()> {
        self.set(repository).await
    }

    async fn set_bulk(&self, repositories: &[Repository], page_size: usize) -> Result<u64> {
        self.set_bulk(repositories, page_size).await
    }
}
