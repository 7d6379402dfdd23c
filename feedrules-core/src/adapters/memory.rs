//! In-memory store implementing every port
//!
//! Useful for embedding hosts that keep their own persistence and for tests.
//! Every port call is tallied by operation name (e.g. "rules.get_active",
//! "articles.update") so callers can assert which collaborators were touched,
//! and any operation can be primed to fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Article, Error, Feed, IdSet, Result, Rule};
use crate::ports::{ArticleRepository, FeedRepository, Notifier, RuleRepository, TagAssociation};

#[derive(Default)]
struct State {
    rules: BTreeMap<i64, Rule>,
    next_rule_id: i64,
    articles: HashMap<i64, Article>,
    feeds: HashMap<i64, Feed>,
    article_tags: BTreeMap<i64, Vec<i64>>,
    notifications: Vec<(i64, i64)>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
}

/// Mutex-guarded in-memory implementation of all ports
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::database("in-memory store lock poisoned"))
    }

    /// Record a port call and fail it if primed to
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock()?;
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(op) {
            return Err(Error::database(format!("injected failure in {}", op)));
        }
        Ok(state)
    }

    // === Seeding and inspection (not counted) ===

    /// Store a rule directly, assigning an id when it has none
    pub fn add_rule(&self, mut rule: Rule) -> Result<Rule> {
        let mut state = self.lock()?;
        if rule.id <= 0 {
            state.next_rule_id += 1;
            rule.id = state.next_rule_id;
        } else {
            state.next_rule_id = state.next_rule_id.max(rule.id);
        }
        state.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    pub fn add_feed(&self, feed: Feed) -> Result<()> {
        self.lock()?.feeds.insert(feed.id, feed);
        Ok(())
    }

    pub fn add_article(&self, article: Article) -> Result<()> {
        self.lock()?.articles.insert(article.id, article);
        Ok(())
    }

    pub fn rule(&self, id: i64) -> Option<Rule> {
        self.lock().ok()?.rules.get(&id).cloned()
    }

    pub fn article(&self, id: i64) -> Option<Article> {
        self.lock().ok()?.articles.get(&id).cloned()
    }

    pub fn feed(&self, id: i64) -> Option<Feed> {
        self.lock().ok()?.feeds.get(&id).cloned()
    }

    /// Tags associated with an article, in application order
    pub fn tags_for(&self, article_id: i64) -> Vec<i64> {
        self.lock()
            .ok()
            .and_then(|s| s.article_tags.get(&article_id).cloned())
            .unwrap_or_default()
    }

    /// (rule id, article id) pairs passed to the notifier
    pub fn notifications(&self) -> Vec<(i64, i64)> {
        self.lock().map(|s| s.notifications.clone()).unwrap_or_default()
    }

    /// How many times an operation was called
    pub fn calls(&self, op: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|s| s.calls.get(op).copied())
            .unwrap_or(0)
    }

    /// Total calls across operations whose name starts with `prefix`
    pub fn calls_with_prefix(&self, prefix: &str) -> usize {
        self.lock()
            .map(|s| {
                s.calls
                    .iter()
                    .filter(|(op, _)| op.starts_with(prefix))
                    .map(|(_, n)| n)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Total write calls (updates, inserts, deletes, increments, tags, notifications)
    pub fn write_calls(&self) -> usize {
        const WRITES: &[&str] = &[
            "rules.insert",
            "rules.update",
            "rules.delete",
            "rules.increment_match_count",
            "articles.update",
            "feeds.update",
            "tags.apply",
            "notifier.notify",
        ];
        WRITES.iter().map(|op| self.calls(op)).sum()
    }

    pub fn reset_calls(&self) {
        if let Ok(mut state) = self.lock() {
            state.calls.clear();
        }
    }

    /// Make every subsequent call to `op` fail with a database error
    pub fn fail_on(&self, op: &'static str) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(op);
        }
    }
}

#[async_trait]
impl RuleRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Rule>> {
        let state = self.enter("rules.get_by_id")?;
        Ok(state.rules.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Rule>> {
        let state = self.enter("rules.get_all")?;
        Ok(state.rules.values().cloned().collect())
    }

    async fn get_active(&self) -> Result<Vec<Rule>> {
        let state = self.enter("rules.get_active")?;
        Ok(state.rules.values().filter(|r| r.enabled).cloned().collect())
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let state = self.enter("rules.exists_by_name")?;
        Ok(state.rules.values().any(|r| r.name == name))
    }

    async fn insert(&self, rule: &Rule) -> Result<Rule> {
        let mut state = self.enter("rules.insert")?;
        state.next_rule_id += 1;
        let mut stored = rule.clone();
        stored.id = state.next_rule_id;
        state.rules.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, rule: &Rule) -> Result<()> {
        let mut state = self.enter("rules.update")?;
        match state.rules.get_mut(&rule.id) {
            Some(existing) => {
                // Only increment_match_count moves the counter
                let match_count = existing.match_count;
                *existing = rule.clone();
                existing.match_count = match_count;
                Ok(())
            }
            None => Err(Error::not_found(format!("rule {}", rule.id))),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.enter("rules.delete")?;
        Ok(state.rules.remove(&id).is_some())
    }

    async fn increment_match_count(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.enter("rules.increment_match_count")?;
        if let Some(rule) = state.rules.get_mut(&id) {
            rule.match_count += 1;
            rule.last_modified = at;
        }
        Ok(())
    }

    async fn get_total_match_count(&self) -> Result<i64> {
        let state = self.enter("rules.get_total_match_count")?;
        Ok(state.rules.values().map(|r| r.match_count).sum())
    }

    async fn get_top_by_match_count(&self, limit: usize) -> Result<Vec<Rule>> {
        let state = self.enter("rules.get_top_by_match_count")?;
        let mut rules: Vec<Rule> = state.rules.values().cloned().collect();
        rules.sort_by(|a, b| b.match_count.cmp(&a.match_count).then(a.id.cmp(&b.id)));
        rules.truncate(limit);
        Ok(rules)
    }
}

#[async_trait]
impl ArticleRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let state = self.enter("articles.get_by_id")?;
        Ok(state.articles.get(&id).cloned())
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let mut state = self.enter("articles.update")?;
        match state.articles.get_mut(&article.id) {
            Some(existing) => {
                *existing = article.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("article {}", article.id))),
        }
    }
}

#[async_trait]
impl FeedRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let state = self.enter("feeds.get_by_id")?;
        Ok(state.feeds.get(&id).cloned())
    }

    async fn update(&self, feed: &Feed) -> Result<()> {
        let mut state = self.enter("feeds.update")?;
        match state.feeds.get_mut(&feed.id) {
            Some(existing) => {
                *existing = feed.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("feed {}", feed.id))),
        }
    }
}

#[async_trait]
impl TagAssociation for InMemoryStore {
    async fn apply(&self, tag_ids: &IdSet, article_id: i64) -> Result<()> {
        let mut state = self.enter("tags.apply")?;
        let tags = state.article_tags.entry(article_id).or_default();
        for id in tag_ids.iter() {
            if !tags.contains(&id) {
                tags.push(id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for InMemoryStore {
    async fn notify(&self, rule: &Rule, article: &Article) -> Result<()> {
        let mut state = self.enter("notifier.notify")?;
        state.notifications.push((rule.id, article.id));
        Ok(())
    }
}
