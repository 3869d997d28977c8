//! 矿工评估仓储
//!
//! 评估历史只追加不更新；一次评估及其全部差异、文件集在单个事务内落库。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::error;

use super::pr_diffs_repo::PrDiffsRepository;
use super::traits::MinerEvaluationsRepositoryTrait;
use crate::error::{Result, classify};
use crate::models::MinerEvaluation;
use crate::queries;

/// 矿工评估仓储
pub struct MinerEvaluationsRepository {
    pool: PgPool,
    pr_diffs: PrDiffsRepository,
}

impl MinerEvaluationsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pr_diffs: PrDiffsRepository::new(pool.clone()),
            pool,
        }
    }

    // ==================== 查询操作 ====================

    /// 按代理主键获取评估（不含 valid_prs）；Ok(None) 表示不存在
    pub async fn get(&self, id: i64) -> Result<Option<MinerEvaluation>> {
        let evaluation = sqlx::query_as::<_, MinerEvaluation>(queries::GET_MINER_EVALUATION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(evaluation)
    }

    /// 按代理主键获取评估并加载全部差异
    pub async fn get_with_prs(&self, id: i64) -> Result<Option<MinerEvaluation>> {
        let Some(mut evaluation) = self.get(id).await? else {
            return Ok(None);
        };

        evaluation.valid_prs = self.pr_diffs.list_by_evaluation(id).await?;
        Ok(Some(evaluation))
    }

    /// 获取某矿工的最新评估
    ///
    /// 时间戳可能缺失或相同，排序固定为
    /// evaluation_timestamp DESC NULLS LAST, id DESC —— 不依赖提交顺序
    pub async fn get_latest_by_uid(&self, uid: i64) -> Result<Option<MinerEvaluation>> {
        let evaluation =
            sqlx::query_as::<_, MinerEvaluation>(queries::GET_LATEST_MINER_EVALUATION)
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(evaluation)
    }

    /// 列出时间范围内的评估，按时间戳与总分降序
    pub async fn list_by_timeframe(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinerEvaluation>> {
        let evaluations =
            sqlx::query_as::<_, MinerEvaluation>(queries::GET_EVALUATIONS_BY_TIMEFRAME)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?;

        Ok(evaluations)
    }

    // ==================== 写入操作 ====================

    /// 写入一次评估及其全部差异与文件集，返回评估的代理主键
    ///
    /// 评估行、差异行、文件行共享一个事务，任一失败整体回滚；
    /// PAT 只绑定 SHA-256 摘要，明文不出内存。
    /// 时间戳缺省由数据库填充 NOW()。
    pub async fn set(&self, evaluation: &MinerEvaluation) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(queries::SET_MINER_EVALUATION)
            .bind(evaluation.uid)
            .bind(&evaluation.github_id)
            .bind(evaluation.github_pat_hash())
            .bind(&evaluation.failed_reason)
            .bind(evaluation.total_score)
            .bind(evaluation.total_lines_changed)
            .bind(evaluation.total_open_prs)
            .bind(evaluation.total_prs())
            .bind(evaluation.unique_repos_count)
            .bind(evaluation.evaluation_timestamp)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(uid = evaluation.uid, "写入矿工评估失败: {e}");
                classify("miner_evaluations", e)
            })?;
        let id: i64 = row.get("id");

        for diff in &evaluation.valid_prs {
            PrDiffsRepository::set_in_tx(&mut tx, diff, id).await?;
        }

        tx.commit().await?;

        Ok(id)
    }
}

#[async_trait]
impl MinerEvaluationsRepositoryTrait for MinerEvaluationsRepository {
    async fn get(&self, id: i64) -> Result<Option<MinerEvaluation>> {
        self.get(id).await
    }

    async fn get_with_prs(&self, id: i64) -> Result<Option<MinerEvaluation>> {
        self.get_with_prs(id).await
    }

    async fn get_latest_by_uid(&self, uid: i64) -> Result<Option<MinerEvaluation>> {
        self.get_latest_by_uid(uid).await
    }

    async fn list_by_timeframe(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinerEvaluation>> {
        self.list_by_timeframe(start, end).await
    }

    async fn set(&self, evaluation: &MinerEvaluation) -> Result<i64> {
        self.set(evaluation).await
    }
}
