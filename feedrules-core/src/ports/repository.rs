//! Repository ports - storage abstractions the engine depends on

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Article, Feed, Result, Rule};

/// Rule storage
///
/// Implementations must make `increment_match_count` atomic per rule id so
/// callers can evaluate many articles concurrently.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Get a rule by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Rule>>;

    /// Get all rules, enabled or not
    async fn get_all(&self) -> Result<Vec<Rule>>;

    /// Get enabled rules only
    async fn get_active(&self) -> Result<Vec<Rule>>;

    /// Whether any rule already uses this name
    async fn exists_by_name(&self, name: &str) -> Result<bool>;

    /// Insert a new rule, returning it with its assigned id
    async fn insert(&self, rule: &Rule) -> Result<Rule>;

    /// Overwrite an existing rule
    async fn update(&self, rule: &Rule) -> Result<()>;

    /// Delete a rule, returning whether it existed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Add one to a rule's match count and stamp its last-modified time
    async fn increment_match_count(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Sum of match counts across all rules
    async fn get_total_match_count(&self) -> Result<i64>;

    /// Rules with the highest match counts, descending
    async fn get_top_by_match_count(&self, limit: usize) -> Result<Vec<Rule>>;
}

/// Article storage
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Get an article by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Persist a mutated article
    async fn update(&self, article: &Article) -> Result<()>;
}

/// Feed storage
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Get a feed by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Feed>>;

    /// Persist a mutated feed
    async fn update(&self, feed: &Feed) -> Result<()>;
}
