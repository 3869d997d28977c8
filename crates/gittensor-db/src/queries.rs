//! SQL 语句目录
//!
//! 每个实体固定一组参数化语句：按键点查、按父键列举、带显式冲突策略的写入。
//! 冲突策略按实体可变性选取，全库一致：
//!
//! - 不可变身份行（repositories）：`DO NOTHING`，重复写入为幂等空操作
//! - 会演化的元数据/得分（pull_requests、issues、pr_diffs）：`DO UPDATE` 刷新可变列
//! - 文件集（file_changes）：以父差异为单位整体替换（先删后插），唯一键为
//!   `(pr_diff_id, filename)`
//! - 评估历史（miner_evaluations）：普通 INSERT，只追加不更新

// ==================== 仓库 ====================

/// 按 full_name 点查
pub const GET_REPOSITORY: &str = r#"
SELECT full_name, name, owner
FROM repositories
WHERE full_name = $1
"#;

/// 仓库身份不可变，冲突时忽略
pub const SET_REPOSITORY: &str = r#"
INSERT INTO repositories (full_name, name, owner)
VALUES ($1, $2, $3)
ON CONFLICT (full_name) DO NOTHING
"#;

pub const GET_ALL_REPOSITORIES: &str = r#"
SELECT full_name, name, owner
FROM repositories
ORDER BY full_name
"#;

// ==================== Pull Request ====================

pub const GET_PULL_REQUEST: &str = r#"
SELECT pr.number, pr.title, pr.repository_full_name, pr.merged_at,
       pr.pr_created_at, pr.additions, pr.deletions, pr.commits, pr.author_login,
       pr.merged_by_login, r.name, r.owner
FROM pull_requests pr
JOIN repositories r ON pr.repository_full_name = r.full_name
WHERE pr.number = $1 AND pr.repository_full_name = $2
"#;

/// PR 元数据（标题、合并状态、行数、账号）会在首次摄取后合法变化，冲突时刷新
pub const SET_PULL_REQUEST: &str = r#"
INSERT INTO pull_requests (
    number, repository_full_name, title, merged_at, pr_created_at,
    additions, deletions, commits, author_login, merged_by_login
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (number, repository_full_name)
DO UPDATE SET
    title = EXCLUDED.title,
    merged_at = EXCLUDED.merged_at,
    additions = EXCLUDED.additions,
    deletions = EXCLUDED.deletions,
    commits = EXCLUDED.commits,
    author_login = EXCLUDED.author_login,
    merged_by_login = EXCLUDED.merged_by_login
"#;

pub const GET_PULL_REQUESTS_BY_REPOSITORY: &str = r#"
SELECT pr.number, pr.title, pr.repository_full_name, pr.merged_at,
       pr.pr_created_at, pr.additions, pr.deletions, pr.commits, pr.author_login,
       pr.merged_by_login, r.name, r.owner
FROM pull_requests pr
JOIN repositories r ON pr.repository_full_name = r.full_name
WHERE pr.repository_full_name = $1
ORDER BY pr.merged_at DESC
"#;

/// 带差异与文件变更的联查，由组合层折叠为嵌套对象图。
/// LEFT JOIN 保证没有差异/文件的 PR 也会返回一行。
pub const GET_PULL_REQUEST_WITH_DIFFS: &str = r#"
SELECT pr.number, pr.title, pr.repository_full_name, pr.merged_at,
       pr.pr_created_at, pr.additions, pr.deletions, pr.commits, pr.author_login,
       pr.merged_by_login, r.name, r.owner,
       pd.id AS pr_diff_id, pd.earned_score,
       fc.id AS file_change_id, fc.filename, fc.changes,
       fc.additions AS file_additions, fc.deletions AS file_deletions,
       fc.status, fc.patch, fc.file_extension
FROM pull_requests pr
JOIN repositories r ON pr.repository_full_name = r.full_name
LEFT JOIN pr_diffs pd ON pr.number = pd.pr_number AND pr.repository_full_name = pd.repository_full_name
LEFT JOIN file_changes fc ON pd.id = fc.pr_diff_id
WHERE pr.number = $1 AND pr.repository_full_name = $2
ORDER BY pd.id ASC, fc.filename ASC
"#;

pub const GET_PULL_REQUESTS_BY_REPOSITORY_WITH_DIFFS: &str = r#"
SELECT pr.number, pr.title, pr.repository_full_name, pr.merged_at,
       pr.pr_created_at, pr.additions, pr.deletions, pr.commits, pr.author_login,
       pr.merged_by_login, r.name, r.owner,
       pd.id AS pr_diff_id, pd.earned_score,
       fc.id AS file_change_id, fc.filename, fc.changes,
       fc.additions AS file_additions, fc.deletions AS file_deletions,
       fc.status, fc.patch, fc.file_extension
FROM pull_requests pr
JOIN repositories r ON pr.repository_full_name = r.full_name
LEFT JOIN pr_diffs pd ON pr.number = pd.pr_number AND pr.repository_full_name = pd.repository_full_name
LEFT JOIN file_changes fc ON pd.id = fc.pr_diff_id
WHERE pr.repository_full_name = $1
ORDER BY pr.merged_at DESC, pr.number ASC, pd.id ASC, fc.filename ASC
"#;

// ==================== PR 差异 ====================

/// 组合键点查：同一物理 PR 每次评估各有一行
pub const GET_PR_DIFF: &str = r#"
SELECT id, pr_number, repository_full_name, miner_evaluation_id, earned_score, total_changes, created_at
FROM pr_diffs
WHERE miner_evaluation_id = $1 AND pr_number = $2 AND repository_full_name = $3
"#;

pub const GET_PR_DIFF_BY_ID: &str = r#"
SELECT id, pr_number, repository_full_name, miner_evaluation_id, earned_score, total_changes, created_at
FROM pr_diffs
WHERE id = $1
"#;

/// 得分由评估重算产生，冲突时刷新
pub const SET_PR_DIFF: &str = r#"
INSERT INTO pr_diffs (
    pr_number, repository_full_name, miner_evaluation_id, earned_score, total_changes
) VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (miner_evaluation_id, pr_number, repository_full_name)
DO UPDATE SET
    earned_score = EXCLUDED.earned_score,
    total_changes = EXCLUDED.total_changes
RETURNING id
"#;

pub const GET_PR_DIFFS_BY_EVALUATION: &str = r#"
SELECT pd.id, pd.pr_number, pd.repository_full_name, pd.miner_evaluation_id,
       pd.earned_score, pd.total_changes, pd.created_at
FROM pr_diffs pd
JOIN pull_requests pr ON pd.pr_number = pr.number AND pd.repository_full_name = pr.repository_full_name
WHERE pd.miner_evaluation_id = $1
ORDER BY pd.earned_score DESC, pr.merged_at DESC
"#;

// ==================== 文件变更 ====================

pub const GET_FILE_CHANGE: &str = r#"
SELECT id, pr_diff_id, filename, changes, additions, deletions, status, patch, file_extension
FROM file_changes
WHERE id = $1
"#;

pub const GET_FILE_CHANGES_BY_PR_DIFF: &str = r#"
SELECT id, pr_diff_id, filename, changes, additions, deletions, status, patch, file_extension
FROM file_changes
WHERE pr_diff_id = $1
ORDER BY filename
"#;

/// 文件集整体替换的第一步：清空父差异名下的既有行
pub const DELETE_FILE_CHANGES_FOR_PR_DIFF: &str = r#"
DELETE FROM file_changes
WHERE pr_diff_id = $1
"#;

pub const INSERT_FILE_CHANGE: &str = r#"
INSERT INTO file_changes (
    pr_diff_id, filename, changes, additions, deletions, status, patch, file_extension
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

// ==================== 矿工评估 ====================

pub const GET_MINER_EVALUATION: &str = r#"
SELECT id, uid, github_id, failed_reason, total_score,
       total_lines_changed, total_open_prs, total_prs,
       unique_repos_count, evaluation_timestamp
FROM miner_evaluations
WHERE id = $1
"#;

/// 时间戳可能缺失或相同，必须带 NULLS LAST 与 id 回退排序
pub const GET_LATEST_MINER_EVALUATION: &str = r#"
SELECT id, uid, github_id, failed_reason, total_score,
       total_lines_changed, total_open_prs, total_prs,
       unique_repos_count, evaluation_timestamp
FROM miner_evaluations
WHERE uid = $1
ORDER BY evaluation_timestamp DESC NULLS LAST, id DESC
LIMIT 1
"#;

/// 评估历史只追加；PAT 一律以哈希入库
pub const SET_MINER_EVALUATION: &str = r#"
INSERT INTO miner_evaluations (
    uid, github_id, github_pat_hash, failed_reason, total_score,
    total_lines_changed, total_open_prs, total_prs, unique_repos_count,
    evaluation_timestamp
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()))
RETURNING id
"#;

pub const GET_EVALUATIONS_BY_TIMEFRAME: &str = r#"
SELECT id, uid, github_id, failed_reason, total_score,
       total_lines_changed, total_open_prs, total_prs,
       unique_repos_count, evaluation_timestamp
FROM miner_evaluations
WHERE evaluation_timestamp BETWEEN $1 AND $2
ORDER BY evaluation_timestamp DESC, total_score DESC
"#;

// ==================== Issue ====================

pub const GET_ISSUE: &str = r#"
SELECT number, pr_number, repository_full_name, title, created_at, closed_at
FROM issues
WHERE number = $1 AND repository_full_name = $2
"#;

pub const GET_ISSUES_BY_REPOSITORY: &str = r#"
SELECT number, pr_number, repository_full_name, title, created_at, closed_at
FROM issues
WHERE repository_full_name = $1
ORDER BY created_at DESC
"#;

pub const GET_ISSUES_BY_PULL_REQUEST: &str = r#"
SELECT number, pr_number, repository_full_name, title, created_at, closed_at
FROM issues
WHERE pr_number = $1 AND repository_full_name = $2
ORDER BY number
"#;

/// 标题与关闭状态会在 issue 生命周期内变化，冲突时刷新
pub const SET_ISSUE: &str = r#"
INSERT INTO issues (
    number, pr_number, repository_full_name, title, created_at, closed_at
) VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (number, repository_full_name)
DO UPDATE SET
    pr_number = EXCLUDED.pr_number,
    title = EXCLUDED.title,
    created_at = EXCLUDED.created_at,
    closed_at = EXCLUDED.closed_at
"#;

// ==================== 批量写入 ====================
//
// 批量语句由「插入前缀 + 生成的多行占位符 + 冲突子句」拼装，
// 每页一次往返，整批共享一个事务（全成或全败）。

pub const BULK_INSERT_REPOSITORIES: &str =
    "INSERT INTO repositories (full_name, name, owner) VALUES ";
pub const BULK_CONFLICT_REPOSITORIES: &str = " ON CONFLICT (full_name) DO NOTHING";

pub const BULK_INSERT_PULL_REQUESTS: &str = "INSERT INTO pull_requests (\
     number, repository_full_name, title, merged_at, pr_created_at, \
     additions, deletions, commits, author_login, merged_by_login) VALUES ";
pub const BULK_CONFLICT_PULL_REQUESTS: &str = " ON CONFLICT (number, repository_full_name) \
     DO UPDATE SET \
     title = EXCLUDED.title, \
     merged_at = EXCLUDED.merged_at, \
     additions = EXCLUDED.additions, \
     deletions = EXCLUDED.deletions, \
     commits = EXCLUDED.commits, \
     author_login = EXCLUDED.author_login, \
     merged_by_login = EXCLUDED.merged_by_login";

pub const BULK_INSERT_ISSUES: &str = "INSERT INTO issues (\
     number, pr_number, repository_full_name, title, created_at, closed_at) VALUES ";
pub const BULK_CONFLICT_ISSUES: &str = " ON CONFLICT (number, repository_full_name) \
     DO UPDATE SET \
     pr_number = EXCLUDED.pr_number, \
     title = EXCLUDED.title, \
     created_at = EXCLUDED.created_at, \
     closed_at = EXCLUDED.closed_at";

pub const BULK_INSERT_PR_DIFFS: &str = "INSERT INTO pr_diffs (\
     pr_number, repository_full_name, miner_evaluation_id, earned_score, total_changes) VALUES ";
pub const BULK_CONFLICT_PR_DIFFS: &str =
    " ON CONFLICT (miner_evaluation_id, pr_number, repository_full_name) \
     DO UPDATE SET \
     earned_score = EXCLUDED.earned_score, \
     total_changes = EXCLUDED.total_changes";

pub const BULK_INSERT_FILE_CHANGES: &str = "INSERT INTO file_changes (\
     pr_diff_id, filename, changes, additions, deletions, status, patch, file_extension) VALUES ";
pub const BULK_CONFLICT_FILE_CHANGES: &str = " ON CONFLICT (pr_diff_id, filename) \
     DO UPDATE SET \
     changes = EXCLUDED.changes, \
     additions = EXCLUDED.additions, \
     deletions = EXCLUDED.deletions, \
     status = EXCLUDED.status, \
     patch = EXCLUDED.patch, \
     file_extension = EXCLUDED.file_extension";
