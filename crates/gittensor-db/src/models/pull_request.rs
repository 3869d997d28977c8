//! Pull Request 与 issue 实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{PRDiff, Repository};
use crate::error::{Result, StorageError};

/// 由 PR 关闭的 issue
///
/// 通过 (pr_number, repository_full_name) 归属于唯一的 PR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub number: i64,
    /// 关联的 PR 号
    pub pr_number: i64,
    pub repository_full_name: String,
    pub title: String,
    /// 历史数据可能缺失时间戳，构造不因此失败
    #[sqlx(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn new(
        number: i64,
        pr_number: i64,
        repository_full_name: impl Into<String>,
        title: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            number,
            pr_number,
            repository_full_name: repository_full_name.into(),
            title: title.into(),
            created_at,
            closed_at,
        }
    }

    /// 从外部 API 的 issue 结构构造，归属到给定 PR
    pub fn from_external_response(
        pr_number: i64,
        repository_full_name: &str,
        payload: &Value,
    ) -> Result<Self> {
        let number = payload
            .get("number")
            .and_then(Value::as_i64)
            .ok_or(StorageError::MissingField {
                entity: "issue",
                field: "number",
            })?;

        Ok(Self::new(
            number,
            pr_number,
            repository_full_name,
            payload.get("title").and_then(Value::as_str).unwrap_or(""),
            parse_timestamp(payload.get("created_at")),
            parse_timestamp(payload.get("closed_at")),
        ))
    }
}

/// Pull Request
///
/// 身份键为 (number, repository_full_name)；仓库作为值对象嵌入，
/// 落库时只引用其 full_name 字符串。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    /// 所属仓库（嵌入值对象，行中对应 name/owner 两列）
    #[sqlx(flatten)]
    pub repository: Repository,
    pub author_login: String,
    #[sqlx(rename = "pr_created_at")]
    pub created_at: DateTime<Utc>,
    pub additions: i64,
    pub deletions: i64,
    pub commits: i64,
    #[sqlx(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub merged_by_login: Option<String>,
    /// 关闭的 issue 集合（按需加载）
    #[sqlx(skip)]
    pub issues: Option<Vec<Issue>>,
    /// 嵌套差异（仅由带子级的查询填充）
    #[sqlx(skip)]
    pub diff: Option<PRDiff>,
}

impl PullRequest {
    /// 所属仓库的业务主键
    pub fn repository_full_name(&self) -> String {
        self.repository.full_name()
    }

    /// 增删行数之和
    pub fn total_changes(&self) -> i64 {
        self.additions + self.deletions
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// 从外部 API 的 PR 结构构造
    ///
    /// 只提取有界的字段集合；可选字段缺失取缺省值，
    /// 身份字段（number、仓库 name/owner）与创建时间缺失才算失败
    pub fn from_external_response(payload: &Value) -> Result<Self> {
        let number = payload
            .get("number")
            .and_then(Value::as_i64)
            .ok_or(StorageError::MissingField {
                entity: "pull_request",
                field: "number",
            })?;

        let repo = payload
            .get("base")
            .and_then(|base| base.get("repo"))
            .ok_or(StorageError::MissingField {
                entity: "pull_request",
                field: "base.repo",
            })?;
        let repo_name = repo
            .get("name")
            .and_then(Value::as_str)
            .ok_or(StorageError::MissingField {
                entity: "pull_request",
                field: "base.repo.name",
            })?;
        let repo_owner = repo
            .get("owner")
            .and_then(|owner| owner.get("login"))
            .and_then(Value::as_str)
            .ok_or(StorageError::MissingField {
                entity: "pull_request",
                field: "base.repo.owner.login",
            })?;

        let created_at = parse_timestamp(payload.get("created_at")).ok_or(
            StorageError::MissingField {
                entity: "pull_request",
                field: "created_at",
            },
        )?;

        Ok(Self {
            number,
            title: payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            repository: Repository::new(repo_name, repo_owner),
            author_login: payload
                .get("user")
                .and_then(|user| user.get("login"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            created_at,
            additions: payload
                .get("additions")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            deletions: payload
                .get("deletions")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            commits: payload.get("commits").and_then(Value::as_i64).unwrap_or(0),
            merged_at: parse_timestamp(payload.get("merged_at")),
            merged_by_login: payload
                .get("merged_by")
                .and_then(|user| user.get("login"))
                .and_then(Value::as_str)
                .map(str::to_string),
            issues: None,
            diff: None,
        })
    }
}

/// RFC 3339 时间戳解析，缺失或非法时返回 None
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
