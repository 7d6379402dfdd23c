//! Process command - run all enabled rules over stored articles

use anyhow::Result;
use colored::Colorize;
use feedrules_core::Article;

use super::{get_context, load_article};
use crate::output;

pub async fn run(all: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let ids = ctx.repository.get_article_ids(!all)?;

    let mut articles: Vec<Article> = Vec::with_capacity(ids.len());
    for id in ids {
        articles.push(load_article(&ctx, id).await?);
    }

    let summary = ctx.automation_service.process_articles(&mut articles).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.articles_processed == 0 {
        output::info("No articles to process");
        return Ok(());
    }

    println!("{}", "Processing complete".bold());
    let mut table = output::create_table();
    table.add_row(vec!["Articles processed", &summary.articles_processed.to_string()]);
    table.add_row(vec!["Articles matched", &summary.articles_matched.to_string()]);
    table.add_row(vec!["Rules matched", &summary.rules_matched.to_string()]);
    table.add_row(vec!["Actions applied", &summary.actions_applied.to_string()]);
    println!("{}", table);
    Ok(())
}
