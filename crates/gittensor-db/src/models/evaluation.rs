//! 矿工评估实体定义

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::PRDiff;

/// 一次矿工评估运行的结果
///
/// 每次评分产生一行，历史只追加不更新；
/// 「最新评估」按 evaluation_timestamp 降序（NULLS LAST）、id 降序回退读取。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MinerEvaluation {
    /// 代理主键（写入前为 None）
    #[sqlx(default)]
    pub id: Option<i64>,
    /// 矿工 UID
    pub uid: i64,
    /// GitHub 账号 ID
    #[sqlx(default)]
    pub github_id: Option<String>,
    /// GitHub PAT，仅存在于内存；入库只保留 SHA-256 摘要
    #[serde(skip)]
    #[sqlx(skip)]
    pub github_pat: Option<String>,
    /// 评估失败原因
    #[sqlx(default)]
    pub failed_reason: Option<String>,
    pub total_score: f64,
    pub total_lines_changed: i64,
    pub total_open_prs: i64,
    /// 权威 PR 总数；并非所有代码路径都加载完整 PR 列表，
    /// 读取时优先用该存储值，缺失才退回 valid_prs 长度
    #[sqlx(default)]
    pub total_prs: Option<i64>,
    pub unique_repos_count: i64,
    /// 贡献过的去重仓库列表（不单独落库）
    #[sqlx(skip)]
    pub unique_repos_contributed_to: Vec<String>,
    #[sqlx(default)]
    pub evaluation_timestamp: Option<DateTime<Utc>>,
    /// 计入得分的 PR 差异集合
    #[sqlx(skip)]
    pub valid_prs: Vec<PRDiff>,
}

impl MinerEvaluation {
    /// 创建一次空评估
    pub fn new(uid: i64) -> Self {
        Self {
            id: None,
            uid,
            github_id: None,
            github_pat: None,
            failed_reason: None,
            total_score: 0.0,
            total_lines_changed: 0,
            total_open_prs: 0,
            total_prs: None,
            unique_repos_count: 0,
            unique_repos_contributed_to: Vec::new(),
            evaluation_timestamp: None,
            valid_prs: Vec::new(),
        }
    }

    /// PR 总数：优先返回存储的权威值，缺失时退回已加载的 valid_prs 长度
    pub fn total_prs(&self) -> i64 {
        self.total_prs.unwrap_or(self.valid_prs.len() as i64)
    }

    /// 由 valid_prs 重新推导行数与仓库统计
    ///
    /// 纯派生计算，可任意次重复调用，只覆盖派生字段
    pub fn calculate_metric_totals(&mut self) {
        self.total_lines_changed = self.valid_prs.iter().map(|pr| pr.total_changes()).sum();

        let repos: BTreeSet<&str> = self
            .valid_prs
            .iter()
            .map(|pr| pr.repository_full_name.as_str())
            .collect();
        self.unique_repos_count = repos.len() as i64;
        self.unique_repos_contributed_to = repos.into_iter().map(str::to_string).collect();
    }

    /// 由 valid_prs 重新汇总总分
    ///
    /// 纯派生计算，可任意次重复调用
    pub fn calculate_score_total(&mut self) {
        self.total_score = self.valid_prs.iter().map(|pr| pr.earned_score).sum();
    }

    /// 开放 PR 刷量惩罚
    ///
    /// total_open_prs ≤ threshold 时返回 1.0 且总分不变；
    /// 超过阈值时总分乘以 max(min_weight, 1 - total_open_prs × penalty_slope)，
    /// 惩罚单调不增且下限钳制在 min_weight。返回实际应用的乘数。
    pub fn apply_open_pr_spam_penalty(
        &mut self,
        threshold: i64,
        min_weight: f64,
        penalty_slope: f64,
    ) -> f64 {
        if self.total_open_prs <= threshold {
            return 1.0;
        }

        let multiplier = (1.0 - self.total_open_prs as f64 * penalty_slope).max(min_weight);
        self.total_score *= multiplier;
        multiplier
    }

    /// PAT 的 SHA-256 十六进制摘要；写入路径只绑定该值，明文不出内存
    pub fn github_pat_hash(&self) -> Option<String> {
        self.github_pat.as_deref().map(|pat| {
            let mut hasher = Sha256::new();
            hasher.update(pat.as_bytes());
            format!("{:x}", hasher.finalize())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileChange;

    fn evaluation_with_prs() -> MinerEvaluation {
        let mut eval = MinerEvaluation::new(42);
        eval.valid_prs = vec![
            PRDiff::new(
                1,
                "octocat/hello-world",
                vec![FileChange::new("a.rs", 10, 8, 2, "modified", None)],
                2.5,
            ),
            PRDiff::new(
                2,
                "octocat/hello-world",
                vec![FileChange::new("b.rs", 5, 5, 0, "added", None)],
                1.5,
            ),
            PRDiff::new(
                3,
                "rust-lang/rust",
                vec![FileChange::new("c.rs", 20, 10, 10, "modified", None)],
                4.0,
            ),
        ];
        eval
    }

    #[test]
    fn test_total_prs_prefers_stored_value() {
        let mut eval = evaluation_with_prs();

        // 存储值与 valid_prs 长度不一致时，以存储值为准
        eval.total_prs = Some(7);
        assert_eq!(eval.total_prs(), 7);

        // 无存储值时退回 valid_prs 长度
        eval.total_prs = None;
        assert_eq!(eval.total_prs(), 3);
    }

    #[test]
    fn test_calculate_metric_totals_is_idempotent() {
        let mut eval = evaluation_with_prs();

        eval.calculate_metric_totals();
        assert_eq!(eval.total_lines_changed, 35);
        assert_eq!(eval.unique_repos_count, 2);
        assert_eq!(
            eval.unique_repos_contributed_to,
            vec!["octocat/hello-world".to_string(), "rust-lang/rust".to_string()]
        );

        // 重复调用不改变结果
        eval.calculate_metric_totals();
        assert_eq!(eval.total_lines_changed, 35);
        assert_eq!(eval.unique_repos_count, 2);
    }

    #[test]
    fn test_calculate_score_total() {
        let mut eval = evaluation_with_prs();
        eval.calculate_score_total();
        assert_eq!(eval.total_score, 8.0);

        eval.calculate_score_total();
        assert_eq!(eval.total_score, 8.0);
    }

    #[test]
    fn test_spam_penalty_below_threshold_is_noop() {
        let mut eval = MinerEvaluation::new(1);
        eval.total_score = 10.0;
        eval.total_open_prs = 5;

        let multiplier = eval.apply_open_pr_spam_penalty(5, 0.5, 0.05);
        assert_eq!(multiplier, 1.0);
        assert_eq!(eval.total_score, 10.0);
    }

    #[test]
    fn test_spam_penalty_clamped_at_min_weight() {
        let mut eval = MinerEvaluation::new(1);
        eval.total_score = 10.0;
        eval.total_open_prs = 20;

        // 1 - 20×0.05 = 0.0，被钳制到 0.5
        let multiplier = eval.apply_open_pr_spam_penalty(5, 0.5, 0.05);
        assert_eq!(multiplier, 0.5);
        assert_eq!(eval.total_score, 5.0);
    }

    #[test]
    fn test_spam_penalty_linear_region() {
        let mut eval = MinerEvaluation::new(1);
        eval.total_score = 10.0;
        eval.total_open_prs = 8;

        let multiplier = eval.apply_open_pr_spam_penalty(5, 0.5, 0.05);
        assert!((multiplier - 0.6).abs() < 1e-9);
        assert!((eval.total_score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_github_pat_hash() {
        let mut eval = MinerEvaluation::new(1);
        assert!(eval.github_pat_hash().is_none());

        eval.github_pat = Some("ghp_example_token".to_string());
        let hash = eval.github_pat_hash().unwrap();
        // SHA-256 十六进制摘要固定 64 位，且不包含明文
        assert_eq!(hash.len(), 64);
        assert!(!hash.contains("ghp"));
    }
}
