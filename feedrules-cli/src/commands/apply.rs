//! Apply command - run one rule's action against one article

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use super::{get_context, load_article};
use crate::output;

pub async fn run(rule_id: i64, article_id: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rule = ctx
        .rule_service
        .get_rule(rule_id)
        .await?
        .with_context(|| format!("Rule {} not found", rule_id))?;
    let mut article = load_article(&ctx, article_id).await?;

    let applied = ctx
        .action_executor
        .execute_actions(Some(&rule), Some(&mut article))
        .await?;

    if json {
        let body = json!({
            "ruleId": rule_id,
            "articleId": article_id,
            "applied": applied,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if applied {
        println!(
            "{} Applied '{}' to article {}",
            "✓".green(),
            output::describe_action(&rule.action),
            article_id
        );
    } else {
        output::warning(&format!(
            "Rule '{}' does not match article {}; nothing applied",
            rule.name, article_id
        ));
    }
    Ok(())
}
