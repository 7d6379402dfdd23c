//! Integration tests for the DuckDB store
//!
//! These run the full engine over a real database file in a temp directory.
//!
//! Run with: cargo test --test duckdb_store_test -- --nocapture

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use feedrules_core::adapters::duckdb::DuckDbRepository;
use feedrules_core::config::EngineConfig;
use feedrules_core::domain::{
    ActionType, Article, ArticleStatus, Feed, IdSet, Operator, RuleDraft, RuleScope, ScopeType,
    TargetField,
};
use feedrules_core::ports::{ArticleRepository, FeedRepository, RuleRepository};
use feedrules_core::FeedRulesContext;

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn create_test_context(temp_dir: &TempDir) -> FeedRulesContext {
    FeedRulesContext::with_repository(EngineConfig::default(), create_test_repo(temp_dir))
}

fn seed(repo: &DuckDbRepository) {
    repo.upsert_feed(&Feed::new(1, "Tech", "https://tech.example/rss").with_category(10))
        .unwrap();
    repo.upsert_feed(&Feed::new(2, "News", "https://news.example/rss"))
        .unwrap();

    let mut article = Article::new(100, 1, "AI News");
    article.content = "Models everywhere".to_string();
    article.categories = "ai, research".to_string();
    article.published_date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    repo.upsert_article(&article).unwrap();

    let mut other = Article::new(101, 2, "Weather");
    other.published_date = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
    repo.upsert_article(&other).unwrap();
}

fn title_contains(name: &str, needle: &str, action: ActionType) -> RuleDraft {
    RuleDraft::new(name, TargetField::Title, Operator::Contains, action).with_value(needle)
}

// ============================================================================
// Schema and round trips
// ============================================================================

#[tokio::test]
async fn test_rule_round_trips_through_json_columns() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let mut draft = title_contains("scoped", "AI", ActionType::ApplyTags);
    draft.scope = ScopeType::SpecificFeeds;
    draft.feed_ids = Some("[2,1,2]".to_string());
    draft.tag_ids = Some("[7]".to_string());
    draft.priority = 3;
    draft.stop_on_match = true;

    let created = ctx.rule_service.create_rule(Some(&draft)).await.unwrap();
    assert!(created.id > 0);

    let loaded = ctx.rule_service.get_rule(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.scope, RuleScope::SpecificFeeds(IdSet::new([2, 1])));
    assert_eq!(loaded.action.action_type(), ActionType::ApplyTags);
    assert_eq!(loaded.priority, 3);
    assert!(loaded.stop_on_match);
    assert_eq!(loaded.matcher, created.matcher);
    assert_eq!(loaded.created_at.timestamp(), created.created_at.timestamp());
}

#[tokio::test]
async fn test_article_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed(&repo);

    let article = ArticleRepository::get_by_id(repo.as_ref(), 100)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "AI News");
    assert_eq!(article.categories, "ai, research");
    assert_eq!(article.status, ArticleStatus::Unread);
    assert_eq!(article.highlight_color, None);
    assert_eq!(
        article.published_date,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    );

    assert!(ArticleRepository::get_by_id(repo.as_ref(), 999)
        .await
        .unwrap()
        .is_none());
    assert!(FeedRepository::get_by_id(repo.as_ref(), 999)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_updating_missing_rows_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);

    let article = Article::new(5, 1, "ghost");
    assert!(ArticleRepository::update(repo.as_ref(), &article).await.is_err());
    assert!(FeedRepository::update(repo.as_ref(), &Feed::new(5, "ghost", "x"))
        .await
        .is_err());
}

#[test]
fn test_article_ids_filter_unread() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    seed(&repo);

    let mut read = Article::new(102, 1, "Old");
    read.status = ArticleStatus::Read;
    read.published_date = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    repo.upsert_article(&read).unwrap();

    assert_eq!(repo.get_article_ids(false).unwrap(), vec![102, 100, 101]);
    assert_eq!(repo.get_article_ids(true).unwrap(), vec![100, 101]);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let rule_id = {
        let ctx = FeedRulesContext::new(temp_dir.path()).unwrap();
        ctx.rule_service
            .create_rule(Some(&title_contains("persisted", "AI", ActionType::MarkAsRead)))
            .await
            .unwrap()
            .id
    };

    let ctx = FeedRulesContext::new(temp_dir.path()).unwrap();
    let rule = ctx.rule_service.get_rule(rule_id).await.unwrap().unwrap();
    assert_eq!(rule.name, "persisted");
}

// ============================================================================
// Engine over DuckDB
// ============================================================================

#[tokio::test]
async fn test_evaluate_and_execute_persist() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    seed(&ctx.repository);

    let rule = ctx
        .rule_service
        .create_rule(Some(&title_contains("AI", "AI", ActionType::MarkAsRead)))
        .await
        .unwrap();

    let mut article = ArticleRepository::get_by_id(ctx.repository.as_ref(), 100)
        .await
        .unwrap()
        .unwrap();
    let matched = ctx.evaluation_service.evaluate(Some(&article)).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].match_count, 1);

    let applied = ctx
        .action_executor
        .execute_actions(Some(&rule), Some(&mut article))
        .await
        .unwrap();
    assert!(applied);

    let stored = ArticleRepository::get_by_id(ctx.repository.as_ref(), 100)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ArticleStatus::Read);

    let stored_rule = ctx.rule_service.get_rule(rule.id).await.unwrap().unwrap();
    assert_eq!(stored_rule.match_count, 2);
}

#[tokio::test]
async fn test_tags_and_category_moves_persist() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    seed(&ctx.repository);

    let mut tags = title_contains("tag ai", "AI", ActionType::ApplyTags);
    tags.tag_ids = Some("[4,2]".to_string());
    let mut mv = title_contains("move ai", "AI", ActionType::MoveToCategory);
    mv.category_id = Some(42);
    ctx.rule_service.create_rule(Some(&tags)).await.unwrap();
    ctx.rule_service.create_rule(Some(&mv)).await.unwrap();

    let mut article = ArticleRepository::get_by_id(ctx.repository.as_ref(), 100)
        .await
        .unwrap()
        .unwrap();
    let outcome = ctx
        .automation_service
        .process_article(&mut article)
        .await
        .unwrap();
    assert_eq!(outcome.actions_applied, 2);

    // Applying again does not duplicate tag rows
    ctx.automation_service
        .process_article(&mut article)
        .await
        .unwrap();

    assert_eq!(ctx.repository.get_article_tags(100).unwrap(), vec![2, 4]);
    let feed = FeedRepository::get_by_id(ctx.repository.as_ref(), 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(feed.category_id, Some(42));
}

#[tokio::test]
async fn test_stats_over_duckdb() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    seed(&ctx.repository);

    let ai = ctx
        .rule_service
        .create_rule(Some(&title_contains("ai", "AI", ActionType::MarkAsStarred)))
        .await
        .unwrap();
    ctx.rule_service
        .create_rule(Some(&title_contains("weather", "Weather", ActionType::MarkAsRead)))
        .await
        .unwrap();
    let disabled = ctx
        .rule_service
        .create_rule(Some(&title_contains("never", "zzz", ActionType::MarkAsRead)))
        .await
        .unwrap();
    ctx.rule_service.set_enabled(disabled.id, false).await.unwrap();

    let article = ArticleRepository::get_by_id(ctx.repository.as_ref(), 100)
        .await
        .unwrap()
        .unwrap();
    ctx.evaluation_service.evaluate(Some(&article)).await.unwrap();
    ctx.evaluation_service.evaluate(Some(&article)).await.unwrap();

    let stats = ctx.rule_service.get_stats(1).await.unwrap();
    assert_eq!(stats.total_rules, 3);
    assert_eq!(stats.enabled_rules, 2);
    assert_eq!(stats.total_match_count, 2);
    assert_eq!(stats.top_rules.len(), 1);
    assert_eq!(stats.top_rules[0].id, ai.id);
}

#[tokio::test]
async fn test_delete_rule() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let rule = ctx
        .rule_service
        .create_rule(Some(&title_contains("gone", "x", ActionType::MarkAsRead)))
        .await
        .unwrap();
    assert!(ctx.rule_service.delete_rule(rule.id).await.unwrap());
    assert!(!ctx.rule_service.delete_rule(rule.id).await.unwrap());
    assert!(!ctx.repository.exists_by_name("gone").await.unwrap());
}

/// Concurrent increments of one rule through a shared repository never lose a count
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_match_count_increments() {
    const TASKS: usize = 8;
    const ITERATIONS: usize = 10;

    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let rule = ctx
        .rule_service
        .create_rule(Some(&title_contains("busy", "x", ActionType::MarkAsRead)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let repo = Arc::clone(&ctx.repository);
        let id = rule.id;
        handles.push(tokio::spawn(async move {
            for _ in 0..ITERATIONS {
                repo.increment_match_count(id, Utc::now()).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = ctx.rule_service.get_rule(rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, (TASKS * ITERATIONS) as i64);
}
