//! Postgres 集成测试
//!
//! 需要可用的数据库：设置 TEST_DATABASE_URL 指向一个可写库后，
//! 以 `cargo test -p gittensor-db -- --ignored` 运行。
//! 各用例使用互不重叠的仓库名/UID，可重复执行。

use chrono::{TimeZone, Utc};
use sqlx::PgPool;

use gittensor_db::models::{FileChange, MinerEvaluation, PRDiff, PullRequest, Repository};
use gittensor_db::repository::{
    MinerEvaluationsRepository, PrDiffsRepository, PullRequestsRepository, RepositoriesRepository,
};
use gittensor_shared::config::DatabaseConfig;
use gittensor_shared::database::Database;

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL 未设置");
    let config = DatabaseConfig {
        url,
        ..DatabaseConfig::default()
    };
    let db = Database::connect(&config).await.expect("连接测试数据库失败");
    db.run_migrations().await.expect("迁移失败");
    db.pool().clone()
}

fn sample_pull_request(number: i64, repository: &Repository, title: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        repository: repository.clone(),
        author_login: "octocat".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        additions: 10,
        deletions: 2,
        commits: 1,
        merged_at: Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()),
        merged_by_login: Some("hubot".to_string()),
        issues: None,
        diff: None,
    }
}

/// 建好某仓库及一个 PR 与一次空评估，返回评估 id
async fn seed_evaluation(pool: &PgPool, repo_name: &str, pr_number: i64, uid: i64) -> i64 {
    let repository = Repository::new(repo_name, "it-tests");
    RepositoriesRepository::new(pool.clone())
        .set(&repository)
        .await
        .unwrap();
    PullRequestsRepository::new(pool.clone())
        .set(&sample_pull_request(pr_number, &repository, "seed"))
        .await
        .unwrap();
    MinerEvaluationsRepository::new(pool.clone())
        .set(&MinerEvaluation::new(uid))
        .await
        .unwrap()
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_repository_upsert_is_idempotent() {
    let pool = test_pool().await;
    let repo = RepositoriesRepository::new(pool);

    let entity = Repository::new("idempotent", "it-tests");
    repo.set(&entity).await.unwrap();
    repo.set(&entity).await.unwrap();

    let found = repo.get("it-tests/idempotent").await.unwrap();
    assert_eq!(found, Some(entity));
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_pull_request_rewrite_refreshes_title() {
    let pool = test_pool().await;
    let repository = Repository::new("retitle", "it-tests");
    RepositoriesRepository::new(pool.clone())
        .set(&repository)
        .await
        .unwrap();

    let prs = PullRequestsRepository::new(pool);
    prs.set(&sample_pull_request(1, &repository, "first title"))
        .await
        .unwrap();
    prs.set(&sample_pull_request(1, &repository, "second title"))
        .await
        .unwrap();

    let found = prs.get(1, "it-tests/retitle").await.unwrap().unwrap();
    assert_eq!(found.title, "second title");

    let all = prs.list_by_repository("it-tests/retitle").await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_pr_diff_set_stores_file_set_atomically() {
    let pool = test_pool().await;
    let evaluation_id = seed_evaluation(&pool, "diff-atomic", 1, 9001).await;

    let diffs = PrDiffsRepository::new(pool);
    let diff = PRDiff::new(
        1,
        "it-tests/diff-atomic",
        vec![
            FileChange::new("src/a.rs", 3, 2, 1, "modified", None),
            FileChange::new("src/b.rs", 7, 7, 0, "added", Some("@@".to_string())),
        ],
        2.5,
    );

    let id = diffs.set(&diff, evaluation_id).await.unwrap();
    let stored = diffs.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.files.len(), 2);
    assert_eq!(stored.total_changes(), 10);
    assert_eq!(stored.earned_score, 2.5);

    // 重新摄取整体替换文件集
    let replacement = PRDiff::new(
        1,
        "it-tests/diff-atomic",
        vec![FileChange::new("src/c.rs", 1, 1, 0, "added", None)],
        3.0,
    );
    let id_again = diffs.set(&replacement, evaluation_id).await.unwrap();
    assert_eq!(id, id_again);

    let stored = diffs.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.files.len(), 1);
    assert_eq!(stored.files[0].filename, "src/c.rs");
    assert_eq!(stored.earned_score, 3.0);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_get_with_diffs_zero_files_yields_empty_collection() {
    let pool = test_pool().await;
    let evaluation_id = seed_evaluation(&pool, "zero-files", 2, 9002).await;

    PrDiffsRepository::new(pool.clone())
        .set(&PRDiff::new(2, "it-tests/zero-files", vec![], 1.0), evaluation_id)
        .await
        .unwrap();

    let pr = PullRequestsRepository::new(pool)
        .get_with_diffs(2, "it-tests/zero-files")
        .await
        .unwrap()
        .unwrap();

    let diff = pr.diff.expect("差异应该存在");
    assert!(diff.files.is_empty());
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_bulk_failure_leaves_no_partial_rows() {
    let pool = test_pool().await;
    seed_evaluation(&pool, "bulk-rollback", 3, 9003).await;

    let diffs: Vec<PRDiff> = (1..=5)
        .map(|n| PRDiff::new(n, "it-tests/bulk-rollback", vec![], 1.0))
        .collect();

    // 不存在的评估 id 触发外键冲突，整批回滚
    let result = PrDiffsRepository::new(pool.clone())
        .set_bulk(&diffs, i64::MAX, 100)
        .await;
    assert!(result.is_err());

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pr_diffs WHERE repository_full_name = $1")
            .bind("it-tests/bulk-rollback")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_latest_evaluation_tiebreak_on_equal_timestamps() {
    let pool = test_pool().await;
    let evaluations = MinerEvaluationsRepository::new(pool);

    let timestamp = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let mut first = MinerEvaluation::new(9004);
    first.evaluation_timestamp = Some(timestamp);
    first.total_score = 1.0;
    let mut second = MinerEvaluation::new(9004);
    second.evaluation_timestamp = Some(timestamp);
    second.total_score = 2.0;

    let first_id = evaluations.set(&first).await.unwrap();
    let second_id = evaluations.set(&second).await.unwrap();
    assert!(second_id > first_id);

    // 时间戳相同，按 id 降序回退
    let latest = evaluations.get_latest_by_uid(9004).await.unwrap().unwrap();
    assert_eq!(latest.id, Some(second_id));
    assert_eq!(latest.total_score, 2.0);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_evaluation_set_persists_nested_prs() {
    let pool = test_pool().await;
    // 先保证仓库与 PR 存在
    seed_evaluation(&pool, "nested", 4, 9005).await;

    let mut evaluation = MinerEvaluation::new(9006);
    evaluation.valid_prs = vec![PRDiff::new(
        4,
        "it-tests/nested",
        vec![FileChange::new("x.py", 2, 1, 1, "modified", None)],
        5.0,
    )];
    evaluation.calculate_metric_totals();
    evaluation.calculate_score_total();

    let evaluations = MinerEvaluationsRepository::new(pool);
    let id = evaluations.set(&evaluation).await.unwrap();

    let stored = evaluations.get_with_prs(id).await.unwrap().unwrap();
    assert_eq!(stored.total_prs(), 1);
    assert_eq!(stored.valid_prs.len(), 1);
    assert_eq!(stored.valid_prs[0].files.len(), 1);
    assert_eq!(stored.total_score, 5.0);
}
