//! Rule service - rule lifecycle and statistics

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::{Error, Result, Rule, RuleDraft};
use crate::ports::RuleRepository;
use crate::services::validation::RuleValidator;

/// Create, update and inspect rules
#[derive(Clone)]
pub struct RuleService {
    rules: Arc<dyn RuleRepository>,
    validator: RuleValidator,
}

impl RuleService {
    pub fn new(rules: Arc<dyn RuleRepository>, validator: RuleValidator) -> Self {
        Self { rules, validator }
    }

    /// Validate and insert a new rule
    ///
    /// A missing draft is a caller bug and fails with `MissingArgument`.
    /// Duplicate names fail with `Conflict` and nothing is inserted.
    pub async fn create_rule(&self, draft: Option<&RuleDraft>) -> Result<Rule> {
        let draft = draft.ok_or(Error::MissingArgument("rule"))?;
        let rule = self.validator.validate(draft, None)?;

        if self.rules.exists_by_name(&rule.name).await? {
            return Err(Error::conflict(format!(
                "A rule named '{}' already exists",
                rule.name
            )));
        }

        let created = self.rules.insert(&rule).await?;
        info!(rule_id = created.id, name = %created.name, "Created rule");
        Ok(created)
    }

    /// Validate and overwrite an existing rule
    ///
    /// Returns `Ok(false)` when no rule has this id.
    pub async fn update_rule(&self, id: i64, draft: Option<&RuleDraft>) -> Result<bool> {
        let draft = draft.ok_or(Error::MissingArgument("rule"))?;

        let Some(existing) = self.rules.get_by_id(id).await? else {
            return Ok(false);
        };

        let rule = self.validator.validate(draft, Some(&existing))?;

        if rule.name != existing.name && self.rules.exists_by_name(&rule.name).await? {
            return Err(Error::conflict(format!(
                "A rule named '{}' already exists",
                rule.name
            )));
        }

        self.rules.update(&rule).await?;
        info!(rule_id = id, name = %rule.name, "Updated rule");
        Ok(true)
    }

    /// Delete a rule, returning whether it existed
    pub async fn delete_rule(&self, id: i64) -> Result<bool> {
        let deleted = self.rules.delete(id).await?;
        if deleted {
            info!(rule_id = id, "Deleted rule");
        }
        Ok(deleted)
    }

    /// Enable or disable a rule, returning whether it existed
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        let Some(mut rule) = self.rules.get_by_id(id).await? else {
            return Ok(false);
        };
        if rule.enabled != enabled {
            rule.enabled = enabled;
            rule.last_modified = Utc::now();
            self.rules.update(&rule).await?;
            info!(rule_id = id, enabled, "Toggled rule");
        }
        Ok(true)
    }

    pub async fn get_rule(&self, id: i64) -> Result<Option<Rule>> {
        self.rules.get_by_id(id).await
    }

    /// All rules in evaluation order
    pub async fn list_rules(&self) -> Result<Vec<Rule>> {
        let mut rules = self.rules.get_all().await?;
        Rule::sort_by_precedence(&mut rules);
        Ok(rules)
    }

    /// Structural validation only; never touches the store
    ///
    /// Unlike `create_rule`, a missing draft is simply invalid.
    pub fn validate_rule(&self, draft: Option<&RuleDraft>) -> bool {
        draft.map_or(false, |d| self.validator.is_valid(d))
    }

    /// Match statistics with the `top` most-matched rules
    pub async fn get_stats(&self, top: usize) -> Result<RuleStats> {
        let all = self.rules.get_all().await?;
        let total_match_count = self.rules.get_total_match_count().await?;
        let top_rules = self
            .rules
            .get_top_by_match_count(top)
            .await?
            .into_iter()
            .map(|r| RuleMatchSummary {
                id: r.id,
                name: r.name,
                match_count: r.match_count,
            })
            .collect();

        Ok(RuleStats {
            total_rules: all.len(),
            enabled_rules: all.iter().filter(|r| r.enabled).count(),
            total_match_count,
            top_rules,
        })
    }
}

/// Summary statistics over all rules
#[derive(Debug, Clone, Serialize)]
pub struct RuleStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub total_match_count: i64,
    pub top_rules: Vec<RuleMatchSummary>,
}

/// A rule's match tally
#[derive(Debug, Clone, Serialize)]
pub struct RuleMatchSummary {
    pub id: i64,
    pub name: String,
    pub match_count: i64,
}
