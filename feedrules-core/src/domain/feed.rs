//! Feed domain model

use serde::{Deserialize, Serialize};

/// A subscribed feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: i64,
    pub title: String,
    pub url: String,
    /// Category the feed is filed under, if any
    pub category_id: Option<i64>,
}

impl Feed {
    pub fn new(id: i64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            category_id: None,
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }
}
