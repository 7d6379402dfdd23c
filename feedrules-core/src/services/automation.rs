//! Automation service - evaluate an article and act on every match

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::domain::{Article, Result};
use crate::services::actions::ActionExecutor;
use crate::services::evaluation::EvaluationService;

/// Evaluate-then-act over one or more articles
///
/// Each matched rule is counted once, by the pipeline; actions are applied
/// without a second count.
#[derive(Clone)]
pub struct AutomationService {
    evaluation: EvaluationService,
    executor: ActionExecutor,
}

impl AutomationService {
    pub fn new(evaluation: EvaluationService, executor: ActionExecutor) -> Self {
        Self {
            evaluation,
            executor,
        }
    }

    /// Run the rules against a single article, mutating it in place
    pub async fn process_article(&self, article: &mut Article) -> Result<ProcessOutcome> {
        let matched = self.evaluation.evaluate(Some(&*article)).await?;

        let mut actions_applied = 0;
        for rule in &matched {
            if self.executor.apply_matched(rule, article).await? {
                actions_applied += 1;
            }
        }

        Ok(ProcessOutcome {
            article_id: article.id,
            matched_rule_ids: matched.iter().map(|r| r.id).collect(),
            actions_applied,
        })
    }

    /// Run the rules against a batch of articles, one after another
    ///
    /// Callers wanting parallelism should fan out over articles themselves;
    /// the stores serialize match-count updates per rule.
    pub async fn process_articles(&self, articles: &mut [Article]) -> Result<ProcessSummary> {
        let mut summary = ProcessSummary::default();
        let mut rules_matched = BTreeSet::new();

        for article in articles.iter_mut() {
            let outcome = self.process_article(article).await?;
            summary.articles_processed += 1;
            if !outcome.matched_rule_ids.is_empty() {
                summary.articles_matched += 1;
            }
            summary.actions_applied += outcome.actions_applied;
            rules_matched.extend(outcome.matched_rule_ids);
        }

        summary.rules_matched = rules_matched.len();
        info!(
            articles = summary.articles_processed,
            matched = summary.articles_matched,
            actions = summary.actions_applied,
            "Processed articles"
        );
        Ok(summary)
    }
}

/// Result of processing one article
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub article_id: i64,
    /// Matched rules, in the order they were evaluated
    pub matched_rule_ids: Vec<i64>,
    pub actions_applied: usize,
}

/// Aggregate result of processing a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub articles_processed: usize,
    /// Articles that matched at least one rule
    pub articles_matched: usize,
    pub actions_applied: usize,
    /// Distinct rules that matched at least one article
    pub rules_matched: usize,
}
