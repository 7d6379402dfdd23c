//! Import command - load feeds and articles into the local store
//!
//! Expects `{"feeds": [...], "articles": [...]}` with camelCase fields.
//! Existing rows with the same id are replaced.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use feedrules_core::{Article, Feed};
use serde::Deserialize;
use serde_json::json;

use super::{get_context, read_document};

#[derive(Deserialize)]
struct ImportDocument {
    #[serde(default)]
    feeds: Vec<Feed>,
    #[serde(default)]
    articles: Vec<Article>,
}

pub fn run(file: Option<&Path>, json: bool) -> Result<()> {
    let doc = read_document(file)?;
    let import: ImportDocument = serde_json::from_str(&doc).context("Invalid import document")?;

    let ctx = get_context()?;
    for feed in &import.feeds {
        ctx.repository.upsert_feed(feed)?;
    }
    for article in &import.articles {
        ctx.repository.upsert_article(article)?;
    }

    if json {
        let body = json!({
            "feeds": import.feeds.len(),
            "articles": import.articles.len(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "{} Imported {} feed(s) and {} article(s)",
        "✓".green(),
        import.feeds.len(),
        import.articles.len()
    );
    Ok(())
}
