//! 组合层：把扁平 JOIN 结果折叠回嵌套对象图
//!
//! 单条联查同时取回 PR、差异与文件变更，避免 N+1 查询，代价是父列逐行重复。
//! 折叠算法：按父实体身份键分组，保持行集中父实体首次出现的顺序；
//! 组内第一行构造父实体，判别列非空的行构造子实体。

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{FileChange, PRDiff, PullRequest, Repository};

/// pull_requests ⟕ pr_diffs ⟕ file_changes 联查结果的一行
///
/// 差异与文件列来自 LEFT JOIN，可能整体为空；
/// `pr_diff_id` 与 `filename` 分别是差异、文件变更的判别列。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PullRequestDiffRow {
    pub number: i64,
    pub title: String,
    pub repository_full_name: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub pr_created_at: DateTime<Utc>,
    pub additions: i64,
    pub deletions: i64,
    pub commits: i64,
    pub author_login: String,
    pub merged_by_login: Option<String>,
    pub name: String,
    pub owner: String,
    // pr_diffs 列
    pub pr_diff_id: Option<i64>,
    pub earned_score: Option<f64>,
    // file_changes 列
    pub file_change_id: Option<i64>,
    pub filename: Option<String>,
    pub changes: Option<i64>,
    pub file_additions: Option<i64>,
    pub file_deletions: Option<i64>,
    pub status: Option<String>,
    pub patch: Option<String>,
    pub file_extension: Option<String>,
}

/// 折叠单个 PR 的行集
///
/// 行集为空返回 None。差异判别列非空时必定产出 Some(PRDiff)，
/// 没有文件行则 files 为空集合，而不是缺失差异。
pub fn fold_pull_request(rows: &[PullRequestDiffRow]) -> Option<PullRequest> {
    let first = rows.first()?;

    let mut pull_request = PullRequest {
        number: first.number,
        title: first.title.clone(),
        repository: Repository::new(first.name.clone(), first.owner.clone()),
        author_login: first.author_login.clone(),
        created_at: first.pr_created_at,
        additions: first.additions,
        deletions: first.deletions,
        commits: first.commits,
        merged_at: first.merged_at,
        merged_by_login: first.merged_by_login.clone(),
        issues: None,
        diff: None,
    };

    if let Some(diff_id) = first.pr_diff_id {
        // 同一 PR 可能带多个评估的差异行；行集按 pd.id 升序，只折叠首个差异，
        // 按评估维度的读取由 PrDiffsRepository 承担
        let files = rows
            .iter()
            .filter(|row| row.pr_diff_id == Some(diff_id))
            .filter_map(row_to_file_change)
            .collect();

        pull_request.diff = Some(PRDiff {
            id: Some(diff_id),
            pr_number: first.number,
            repository_full_name: first.repository_full_name.clone(),
            files,
            earned_score: first.earned_score.unwrap_or(0.0),
        });
    }

    Some(pull_request)
}

/// 折叠多 PR 行集
///
/// 按 (number, repository_full_name) 分组，分组顺序与父实体在行集中
/// 首次出现的顺序一致，组内行序保持查询返回顺序。
pub fn fold_pull_requests(rows: Vec<PullRequestDiffRow>) -> Vec<PullRequest> {
    let mut order: Vec<(i64, String)> = Vec::new();
    let mut groups: HashMap<(i64, String), Vec<PullRequestDiffRow>> = HashMap::new();

    for row in rows {
        let key = (row.number, row.repository_full_name.clone());
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    order
        .into_iter()
        .filter_map(|key| fold_pull_request(&groups[&key]))
        .collect()
}

/// 文件判别列非空时还原 FileChange
fn row_to_file_change(row: &PullRequestDiffRow) -> Option<FileChange> {
    let filename = row.filename.clone()?;
    Some(FileChange {
        id: row.file_change_id,
        file_extension: row
            .file_extension
            .clone()
            .unwrap_or_else(|| FileChange::extension_of(&filename)),
        filename,
        changes: row.changes.unwrap_or(0),
        additions: row.file_additions.unwrap_or(0),
        deletions: row.file_deletions.unwrap_or(0),
        status: row.status.clone().unwrap_or_default(),
        patch: row.patch.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_row(number: i64) -> PullRequestDiffRow {
        PullRequestDiffRow {
            number,
            title: format!("PR #{number}"),
            repository_full_name: "octocat/hello-world".to_string(),
            merged_at: None,
            pr_created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            additions: 10,
            deletions: 2,
            commits: 1,
            author_login: "octocat".to_string(),
            merged_by_login: None,
            name: "hello-world".to_string(),
            owner: "octocat".to_string(),
            pr_diff_id: None,
            earned_score: None,
            file_change_id: None,
            filename: None,
            changes: None,
            file_additions: None,
            file_deletions: None,
            status: None,
            patch: None,
            file_extension: None,
        }
    }

    fn row_with_file(number: i64, diff_id: i64, filename: &str) -> PullRequestDiffRow {
        let mut row = base_row(number);
        row.pr_diff_id = Some(diff_id);
        row.earned_score = Some(3.5);
        row.file_change_id = Some(100);
        row.filename = Some(filename.to_string());
        row.changes = Some(4);
        row.file_additions = Some(3);
        row.file_deletions = Some(1);
        row.status = Some("modified".to_string());
        row.file_extension = Some(FileChange::extension_of(filename));
        row
    }

    #[test]
    fn test_fold_empty_rows() {
        assert!(fold_pull_request(&[]).is_none());
    }

    #[test]
    fn test_fold_one_parent_three_children_preserves_order() {
        let rows = vec![
            row_with_file(1, 7, "a.rs"),
            row_with_file(1, 7, "b.rs"),
            row_with_file(1, 7, "c.rs"),
        ];

        let pr = fold_pull_request(&rows).unwrap();
        let diff = pr.diff.as_ref().unwrap();
        assert_eq!(diff.files.len(), 3);
        let filenames: Vec<&str> = diff.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(filenames, vec!["a.rs", "b.rs", "c.rs"]);
        assert_eq!(diff.earned_score, 3.5);
    }

    #[test]
    fn test_fold_diff_without_files_yields_empty_collection() {
        // 差异判别列非空但没有任何文件行
        let mut row = base_row(1);
        row.pr_diff_id = Some(7);
        row.earned_score = Some(1.0);

        let pr = fold_pull_request(&[row]).unwrap();
        let diff = pr.diff.as_ref().unwrap();
        assert!(diff.files.is_empty());
        assert_eq!(diff.id, Some(7));
    }

    #[test]
    fn test_fold_without_diff_yields_none_diff() {
        let pr = fold_pull_request(&[base_row(1)]).unwrap();
        assert!(pr.diff.is_none());
    }

    #[test]
    fn test_fold_many_groups_by_first_seen_order() {
        let rows = vec![
            row_with_file(3, 30, "x.py"),
            row_with_file(1, 10, "a.py"),
            row_with_file(1, 10, "b.py"),
            row_with_file(2, 20, "c.py"),
        ];

        let prs = fold_pull_requests(rows);
        let numbers: Vec<i64> = prs.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![3, 1, 2]);
        assert_eq!(prs[1].diff.as_ref().unwrap().files.len(), 2);
    }

    #[test]
    fn test_fold_collapses_repeated_parent_columns() {
        let rows = vec![row_with_file(1, 7, "a.rs"), row_with_file(1, 7, "b.rs")];
        let prs = fold_pull_requests(rows);
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].additions, 10);
    }
}
