//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services depend
//! only on these traits, never on a concrete store.

mod collaborators;
mod repository;

pub use collaborators::{Notifier, TagAssociation};
pub use repository::{ArticleRepository, FeedRepository, RuleRepository};
