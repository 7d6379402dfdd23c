//! Article domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read state of an article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleStatus {
    #[default]
    Unread,
    Read,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Unread => "Unread",
            ArticleStatus::Read => "Read",
        }
    }

    /// Parse a stored status; anything unrecognized reads as unread
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("read") {
            ArticleStatus::Read
        } else {
            ArticleStatus::Unread
        }
    }
}

/// A single item pulled from a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub author: String,
    /// Comma-separated category tags as published by the feed
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub link: String,
    pub published_date: DateTime<Utc>,
    #[serde(default)]
    pub status: ArticleStatus,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub is_favorite: bool,
    /// Set by highlight rules
    #[serde(default)]
    pub highlight_color: Option<String>,
}

impl Article {
    /// Create an unread article with the given title and empty text fields
    pub fn new(id: i64, feed_id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            feed_id,
            title: title.into(),
            content: String::new(),
            summary: String::new(),
            author: String::new(),
            categories: String::new(),
            link: String::new(),
            published_date: Utc::now(),
            status: ArticleStatus::Unread,
            is_starred: false,
            is_favorite: false,
            highlight_color: None,
        }
    }

    /// Individual category tags, trimmed, blanks dropped
    pub fn category_list(&self) -> Vec<&str> {
        self.categories
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn is_read(&self) -> bool {
        self.status == ArticleStatus::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_list() {
        let mut article = Article::new(1, 1, "x");
        article.categories = " tech, ai ,,rust ".to_string();
        assert_eq!(article.category_list(), vec!["tech", "ai", "rust"]);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ArticleStatus::parse("Read"), ArticleStatus::Read);
        assert_eq!(ArticleStatus::parse("unread"), ArticleStatus::Unread);
        assert_eq!(ArticleStatus::parse("garbage"), ArticleStatus::Unread);
    }
}
