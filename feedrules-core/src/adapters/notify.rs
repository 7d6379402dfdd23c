//! Notifier that emits rule notifications as tracing events

use async_trait::async_trait;
use tracing::info;

use crate::domain::{Article, Result, Rule};
use crate::ports::Notifier;

/// Writes each notification to the `feedrules::notify` tracing target
///
/// Hosts with a real delivery channel supply their own `Notifier`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, rule: &Rule, article: &Article) -> Result<()> {
        info!(
            target: "feedrules::notify",
            rule_id = rule.id,
            rule = %rule.name,
            article_id = article.id,
            title = %article.title,
            link = %article.link,
            "Rule notification"
        );
        Ok(())
    }
}
