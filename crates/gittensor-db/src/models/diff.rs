//! PR 差异相关实体定义
//!
//! 包含单文件变更与按评估维度存储的 PR 差异集合

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StorageError};

/// 单个文件的变更记录
///
/// 归属于唯一的一个 PR 差异；代理主键由存储层分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// 代理主键（写入前为 None）
    #[sqlx(default)]
    pub id: Option<i64>,
    /// 文件路径
    pub filename: String,
    /// 总变更行数
    pub changes: i64,
    pub additions: i64,
    pub deletions: i64,
    /// 变更状态（added/modified/removed/renamed 等，外部集合开放，保持字符串）
    pub status: String,
    /// 补丁文本（大文件或二进制变更时缺失）
    #[sqlx(default)]
    pub patch: Option<String>,
    /// 文件扩展名（构造时从文件名推导，统一小写）
    pub file_extension: String,
}

impl FileChange {
    /// 创建文件变更，扩展名从文件名推导
    pub fn new(
        filename: impl Into<String>,
        changes: i64,
        additions: i64,
        deletions: i64,
        status: impl Into<String>,
        patch: Option<String>,
    ) -> Self {
        let filename = filename.into();
        let file_extension = Self::extension_of(&filename);
        Self {
            id: None,
            filename,
            changes,
            additions,
            deletions,
            status: status.into(),
            patch,
            file_extension,
        }
    }

    /// 从文件名推导扩展名：最后一个 '.' 之后的小写子串，无 '.' 时为空串
    pub fn extension_of(filename: &str) -> String {
        match filename.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => String::new(),
        }
    }

    /// 从外部 API 的单文件结构构造
    ///
    /// 可选字段缺失时取缺省值，只有 filename 缺失才算失败
    pub fn from_external_response(payload: &Value) -> Result<Self> {
        let filename = payload
            .get("filename")
            .and_then(Value::as_str)
            .ok_or(StorageError::MissingField {
                entity: "file_change",
                field: "filename",
            })?;

        Ok(Self::new(
            filename,
            payload.get("changes").and_then(Value::as_i64).unwrap_or(0),
            payload
                .get("additions")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            payload
                .get("deletions")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("modified"),
            payload
                .get("patch")
                .and_then(Value::as_str)
                .map(str::to_string),
        ))
    }
}

/// 一次评估中某 PR 的差异集合
///
/// 同一物理 PR 在不同评估运行下各有一行，得分随评估而异。
/// 存储身份为组合键 (miner_evaluation_id, pr_number, repository_full_name)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PRDiff {
    /// 代理主键（写入前为 None）
    #[sqlx(default)]
    pub id: Option<i64>,
    pub pr_number: i64,
    pub repository_full_name: String,
    /// 文件变更集合（扁平行查询后由仓储/组合层填充）
    #[sqlx(skip)]
    pub files: Vec<FileChange>,
    /// 本次评估获得的分数
    pub earned_score: f64,
}

impl PRDiff {
    pub fn new(
        pr_number: i64,
        repository_full_name: impl Into<String>,
        files: Vec<FileChange>,
        earned_score: f64,
    ) -> Self {
        Self {
            id: None,
            pr_number,
            repository_full_name: repository_full_name.into(),
            files,
            earned_score,
        }
    }

    /// 所有文件的变更行数之和
    pub fn total_changes(&self) -> i64 {
        self.files.iter().map(|f| f.changes).sum()
    }

    /// 差异中出现过的非空扩展名集合
    pub fn file_types(&self) -> BTreeSet<String> {
        self.files
            .iter()
            .filter(|f| !f.file_extension.is_empty())
            .map(|f| f.file_extension.clone())
            .collect()
    }

    /// 从外部 API 响应构造
    ///
    /// 接受文件数组本身，或带 "files" 键的外层对象；files 缺失视为空差异
    pub fn from_external_response(
        pr_number: i64,
        repository_full_name: &str,
        payload: &Value,
    ) -> Result<Self> {
        let file_entries = match payload {
            Value::Array(entries) => entries.as_slice(),
            _ => payload
                .get("files")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        };

        let files = file_entries
            .iter()
            .map(FileChange::from_external_response)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(pr_number, repository_full_name, files, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_derivation() {
        assert_eq!(FileChange::extension_of("README"), "");
        assert_eq!(FileChange::extension_of("App.TSX"), "tsx");
        assert_eq!(FileChange::extension_of("src/lib.rs"), "rs");
        assert_eq!(FileChange::extension_of(".gitignore"), "gitignore");
    }

    #[test]
    fn test_new_derives_extension() {
        let fc = FileChange::new("src/Main.Java", 10, 8, 2, "modified", None);
        assert_eq!(fc.file_extension, "java");
        assert!(fc.id.is_none());
    }

    #[test]
    fn test_total_changes_sums_files() {
        let diff = PRDiff::new(
            42,
            "octocat/hello-world",
            vec![
                FileChange::new("a.rs", 3, 2, 1, "modified", None),
                FileChange::new("b.rs", 7, 7, 0, "added", None),
            ],
            0.0,
        );
        assert_eq!(diff.total_changes(), 10);
    }

    #[test]
    fn test_total_changes_empty_file_list() {
        let diff = PRDiff::new(42, "octocat/hello-world", vec![], 0.0);
        assert_eq!(diff.total_changes(), 0);
    }

    #[test]
    fn test_file_types_skips_empty_extensions() {
        let diff = PRDiff::new(
            42,
            "octocat/hello-world",
            vec![
                FileChange::new("Makefile", 1, 1, 0, "modified", None),
                FileChange::new("a.rs", 1, 1, 0, "modified", None),
                FileChange::new("b.RS", 1, 1, 0, "modified", None),
            ],
            0.0,
        );
        let types = diff.file_types();
        assert_eq!(types.len(), 1);
        assert!(types.contains("rs"));
    }

    #[test]
    fn test_file_change_from_external_response() {
        let payload = json!({
            "filename": "src/lib.rs",
            "changes": 12,
            "additions": 9,
            "deletions": 3,
            "status": "modified",
            "patch": "@@ -1,3 +1,9 @@"
        });
        let fc = FileChange::from_external_response(&payload).unwrap();
        assert_eq!(fc.filename, "src/lib.rs");
        assert_eq!(fc.changes, 12);
        assert_eq!(fc.file_extension, "rs");
        assert_eq!(fc.patch.as_deref(), Some("@@ -1,3 +1,9 @@"));
    }

    #[test]
    fn test_file_change_missing_filename_fails() {
        let payload = json!({ "changes": 1 });
        let err = FileChange::from_external_response(&payload).unwrap_err();
        assert!(matches!(
            err,
            StorageError::MissingField {
                entity: "file_change",
                field: "filename"
            }
        ));
    }

    #[test]
    fn test_pr_diff_from_external_array_payload() {
        let payload = json!([
            { "filename": "a.py", "changes": 4, "additions": 4, "deletions": 0, "status": "added" },
            { "filename": "b.py", "changes": 2, "additions": 1, "deletions": 1, "status": "modified" }
        ]);
        let diff = PRDiff::from_external_response(7, "octocat/hello-world", &payload).unwrap();
        assert_eq!(diff.files.len(), 2);
        assert_eq!(diff.total_changes(), 6);
        assert_eq!(diff.earned_score, 0.0);
    }

    #[test]
    fn test_pr_diff_from_external_missing_files_is_empty() {
        let payload = json!({ "number": 7 });
        let diff = PRDiff::from_external_response(7, "octocat/hello-world", &payload).unwrap();
        assert!(diff.files.is_empty());
    }
}
