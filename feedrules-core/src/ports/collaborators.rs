//! Collaborator ports - side effects the engine delegates

use async_trait::async_trait;

use crate::domain::{Article, IdSet, Result, Rule};

/// Tag-association storage
#[async_trait]
pub trait TagAssociation: Send + Sync {
    /// Associate the given tags with an article
    async fn apply(&self, tag_ids: &IdSet, article_id: i64) -> Result<()>;
}

/// Notification delivery
///
/// Idempotency of repeated notifications is the implementation's concern.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, rule: &Rule, article: &Article) -> Result<()>;
}
