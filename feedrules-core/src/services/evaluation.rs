//! Evaluation pipeline - which enabled rules match an article
//!
//! Rules are re-fetched on every call so edits made between calls are always
//! seen. Evaluation for one article is sequential: ordering, stop-on-match and
//! the match-count writes depend on it. Store faults propagate as-is.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::domain::{Article, Result, Rule};
use crate::ports::{FeedRepository, RuleRepository};
use crate::services::condition::ConditionEvaluator;
use crate::services::scope::in_scope;

/// Orchestrates rule lookup, ordering, scope and condition checks
#[derive(Clone)]
pub struct EvaluationService {
    rules: Arc<dyn RuleRepository>,
    feeds: Arc<dyn FeedRepository>,
    evaluator: ConditionEvaluator,
}

impl EvaluationService {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        feeds: Arc<dyn FeedRepository>,
        evaluator: ConditionEvaluator,
    ) -> Self {
        Self {
            rules,
            feeds,
            evaluator,
        }
    }

    /// Evaluate all enabled rules against an article
    ///
    /// Returns matched rules in precedence order (priority, then id). Each
    /// match has its count incremented in the store, and the returned copy
    /// reflects that increment. A missing article or an unresolvable feed
    /// yields an empty list.
    pub async fn evaluate(&self, article: Option<&Article>) -> Result<Vec<Rule>> {
        let Some(article) = article else {
            return Ok(Vec::new());
        };

        let mut rules = self.rules.get_active().await?;
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let Some(feed) = self.feeds.get_by_id(article.feed_id).await? else {
            debug!(
                article_id = article.id,
                feed_id = article.feed_id,
                "Feed not found, no rules apply"
            );
            return Ok(Vec::new());
        };

        Rule::sort_by_precedence(&mut rules);

        let mut matched = Vec::new();
        for mut rule in rules {
            if !in_scope(&rule, article, &feed) {
                debug!(rule_id = rule.id, article_id = article.id, "Rule out of scope");
                continue;
            }
            if !self.evaluator.matches(&rule, article) {
                continue;
            }

            let now = Utc::now();
            self.rules.increment_match_count(rule.id, now).await?;
            rule.match_count += 1;
            rule.last_modified = now;

            debug!(rule_id = rule.id, article_id = article.id, "Rule matched");
            let stop = rule.stop_on_match;
            matched.push(rule);
            if stop {
                break;
            }
        }

        Ok(matched)
    }
}
