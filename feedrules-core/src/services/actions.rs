//! Action execution - applying a matched rule's mutation
//!
//! Every action overwrites state rather than toggling it, so re-running an
//! unchanged match leaves the article and feed as they were. Notify is the
//! exception; repeated delivery is the notifier's concern.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{Article, ArticleStatus, Feed, Result, Rule, RuleAction};
use crate::ports::{ArticleRepository, FeedRepository, Notifier, RuleRepository, TagAssociation};
use crate::services::condition::ConditionEvaluator;
use crate::services::scope::in_scope;

/// Applies rule actions to articles and feeds
#[derive(Clone)]
pub struct ActionExecutor {
    rules: Arc<dyn RuleRepository>,
    articles: Arc<dyn ArticleRepository>,
    feeds: Arc<dyn FeedRepository>,
    tags: Arc<dyn TagAssociation>,
    notifier: Arc<dyn Notifier>,
    evaluator: ConditionEvaluator,
}

impl ActionExecutor {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        articles: Arc<dyn ArticleRepository>,
        feeds: Arc<dyn FeedRepository>,
        tags: Arc<dyn TagAssociation>,
        notifier: Arc<dyn Notifier>,
        evaluator: ConditionEvaluator,
    ) -> Self {
        Self {
            rules,
            articles,
            feeds,
            tags,
            notifier,
            evaluator,
        }
    }

    /// Re-check the match and, if it holds, apply the rule's action
    ///
    /// The caller's earlier match is not trusted: the feed is resolved and
    /// scope and condition are evaluated again. On success the article is
    /// mutated in place, persisted, and the rule's match count incremented.
    /// Returns false (with no writes) when either argument is missing, the
    /// feed cannot be resolved, or the rule no longer matches.
    pub async fn execute_actions(
        &self,
        rule: Option<&Rule>,
        article: Option<&mut Article>,
    ) -> Result<bool> {
        let (Some(rule), Some(article)) = (rule, article) else {
            return Ok(false);
        };

        let Some(feed) = self.feeds.get_by_id(article.feed_id).await? else {
            return Ok(false);
        };

        if !in_scope(rule, article, &feed) || !self.evaluator.matches(rule, article) {
            return Ok(false);
        }

        if !self.apply(rule, article, Some(feed)).await? {
            return Ok(false);
        }
        self.rules.increment_match_count(rule.id, Utc::now()).await?;
        Ok(true)
    }

    /// Apply an action for a match the pipeline already checked and counted
    pub(crate) async fn apply_matched(&self, rule: &Rule, article: &mut Article) -> Result<bool> {
        self.apply(rule, article, None).await
    }

    async fn apply(&self, rule: &Rule, article: &mut Article, feed: Option<Feed>) -> Result<bool> {
        match &rule.action {
            RuleAction::MarkAsRead => {
                article.status = ArticleStatus::Read;
                self.articles.update(article).await?;
            }
            RuleAction::MarkAsStarred => {
                article.is_starred = true;
                self.articles.update(article).await?;
            }
            RuleAction::MarkAsFavorite => {
                article.is_favorite = true;
                self.articles.update(article).await?;
            }
            RuleAction::HighlightArticle(color) => {
                article.highlight_color = Some(color.clone());
                self.articles.update(article).await?;
            }
            RuleAction::ApplyTags(tag_ids) => {
                self.tags.apply(tag_ids, article.id).await?;
            }
            RuleAction::MoveToCategory(category_id) => {
                let mut feed = match feed {
                    Some(feed) => feed,
                    None => match self.feeds.get_by_id(article.feed_id).await? {
                        Some(feed) => feed,
                        None => return Ok(false),
                    },
                };
                feed.category_id = Some(*category_id);
                self.feeds.update(&feed).await?;
            }
            RuleAction::Notify => {
                self.notifier.notify(rule, article).await?;
            }
        }

        info!(
            rule_id = rule.id,
            article_id = article.id,
            action = rule.action_type().as_str(),
            "Applied rule action"
        );
        Ok(true)
    }
}
