//! FeedRules Core - Rule evaluation and action execution for a feed reader
//!
//! This crate implements the rule engine following hexagonal architecture:
//!
//! - **domain**: Core entities (Rule, Article, Feed) and the error model
//! - **ports**: Trait definitions for stores and collaborators
//! - **services**: Validation, evaluation, action execution and rule lifecycle
//! - **adapters**: Concrete implementations (DuckDB, in-memory, tracing notifier)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::notify::TracingNotifier;
use config::EngineConfig;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    ActionType, Article, ArticleStatus, Condition, ConditionGroup, Feed, IdSet, Operator, Rule,
    RuleAction, RuleDraft, RuleMatcher, RuleScope, ScopeType, TargetField,
};
pub use domain::result::{Error, ValidationError};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "feedrules.duckdb";

/// Main context for rule engine operations
///
/// Holds the DuckDB store, configuration, and every service wired to it.
pub struct FeedRulesContext {
    pub config: EngineConfig,
    pub repository: Arc<DuckDbRepository>,
    pub rule_service: RuleService,
    pub evaluation_service: EvaluationService,
    pub action_executor: ActionExecutor,
    pub automation_service: AutomationService,
}

impl FeedRulesContext {
    /// Open the engine rooted at a data directory, creating it if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let config = EngineConfig::load(data_dir)?;
        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);

        // Initialize schema
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, repository))
    }

    /// Wire services over an already-open repository
    pub fn with_repository(config: EngineConfig, repository: Arc<DuckDbRepository>) -> Self {
        let evaluator = ConditionEvaluator::from_config(&config);
        let validator = RuleValidator::new(&config);

        let rule_service = RuleService::new(repository.clone(), validator);
        let evaluation_service =
            EvaluationService::new(repository.clone(), repository.clone(), evaluator.clone());
        let action_executor = ActionExecutor::new(
            repository.clone(),
            repository.clone(),
            repository.clone(),
            repository.clone(),
            Arc::new(TracingNotifier),
            evaluator,
        );
        let automation_service =
            AutomationService::new(evaluation_service.clone(), action_executor.clone());

        Self {
            config,
            repository,
            rule_service,
            evaluation_service,
            action_executor,
            automation_service,
        }
    }
}
