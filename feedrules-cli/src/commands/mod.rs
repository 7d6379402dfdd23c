//! CLI command implementations

pub mod apply;
pub mod evaluate;
pub mod import;
pub mod process;
pub mod rules;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use feedrules_core::{Article, FeedRulesContext};

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FEEDRULES_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set FEEDRULES_DIR")?;
    Ok(home.join(".feedrules"))
}

/// Open the engine in the data directory
pub fn get_context() -> Result<FeedRulesContext> {
    let data_dir = get_data_dir()?;
    FeedRulesContext::new(&data_dir)
        .with_context(|| format!("Failed to open rule store in {}", data_dir.display()))
}

/// Read a JSON document from a file, or from stdin when no file is given
pub fn read_document(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No input provided. Pass a JSON file path or pipe JSON on stdin.");
            }
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Load a stored article or fail with a readable message
pub async fn load_article(ctx: &FeedRulesContext, article_id: i64) -> Result<Article> {
    use feedrules_core::ports::ArticleRepository;

    ArticleRepository::get_by_id(ctx.repository.as_ref(), article_id)
        .await?
        .with_context(|| format!("Article {} not found", article_id))
}
