//! Core domain entities
//!
//! Pure data structures - no I/O or external dependencies.

mod article;
mod feed;
pub mod result;
pub mod rule;

pub use article::{Article, ArticleStatus};
pub use feed::Feed;
pub use result::{Error, Result, ValidationError};
pub use rule::{
    ActionType, Condition, ConditionGroup, IdSet, Operator, Rule, RuleAction, RuleDraft,
    RuleMatcher, RuleScope, ScopeType, TargetField,
};
