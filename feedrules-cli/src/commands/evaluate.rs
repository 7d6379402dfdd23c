//! Evaluate command - match an article against the enabled rules

use anyhow::Result;
use colored::Colorize;

use super::{get_context, load_article};
use crate::output;

pub async fn run(article_id: i64, apply: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut article = load_article(&ctx, article_id).await?;

    if apply {
        let outcome = ctx.automation_service.process_article(&mut article).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }
        if outcome.matched_rule_ids.is_empty() {
            output::warning(&format!("No rules matched article {}", article_id));
            return Ok(());
        }
        let ids: Vec<String> = outcome.matched_rule_ids.iter().map(|id| id.to_string()).collect();
        println!("{} Matched rules: {}", "✓".green(), ids.join(", "));
        println!("  Actions applied: {}", outcome.actions_applied);
        return Ok(());
    }

    let matched = ctx.evaluation_service.evaluate(Some(&article)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&matched)?);
        return Ok(());
    }

    if matched.is_empty() {
        output::warning(&format!("No rules matched article {}", article_id));
        return Ok(());
    }

    println!("{} '{}'", "Rules matching".bold(), article.title);
    println!("{}", output::rules_table(&matched));
    Ok(())
}
