//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. None of them hold
//! locks, retry, or cache rules between calls.

pub mod actions;
pub mod automation;
pub mod condition;
pub mod evaluation;
pub mod migration;
pub mod rules;
pub mod scope;
pub mod validation;

pub use actions::ActionExecutor;
pub use automation::{AutomationService, ProcessOutcome, ProcessSummary};
pub use condition::ConditionEvaluator;
pub use evaluation::EvaluationService;
pub use migration::{MigrationResult, MigrationService};
pub use rules::{RuleMatchSummary, RuleService, RuleStats};
pub use scope::in_scope;
pub use validation::RuleValidator;
