//! Condition evaluation against article fields

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::config::EngineConfig;
use crate::domain::{Article, Condition, ConditionGroup, Operator, Rule, RuleMatcher};

/// Compile a rule pattern with the given case handling
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
}

/// Evaluates rule conditions against articles
///
/// Compiled patterns are cached by source text and shared between clones.
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    case_sensitive: bool,
    patterns: Arc<Mutex<HashMap<String, Regex>>>,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConditionEvaluator {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            patterns: Arc::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.case_sensitive)
    }

    /// Number of distinct patterns compiled so far
    pub fn cached_patterns(&self) -> usize {
        self.patterns.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Compiled regex for a pattern, compiling once per distinct source
    fn pattern(&self, source: &str) -> Result<Regex, regex::Error> {
        let mut cache = match self.patterns.lock() {
            Ok(cache) => cache,
            Err(_) => return compile_pattern(source, self.case_sensitive),
        };
        if let Some(re) = cache.get(source) {
            return Ok(re.clone());
        }
        let re = compile_pattern(source, self.case_sensitive)?;
        cache.insert(source.to_string(), re.clone());
        Ok(re)
    }

    /// Whether the rule's condition (simple or compound) holds for the article
    pub fn matches(&self, rule: &Rule, article: &Article) -> bool {
        match &rule.matcher {
            RuleMatcher::Simple(cond) => self.matches_condition(cond, article),
            RuleMatcher::Advanced(group) => self.matches_group(group, article),
        }
    }

    /// Evaluate a compound tree, short-circuiting AND/OR nodes
    pub fn matches_group(&self, group: &ConditionGroup, article: &Article) -> bool {
        match group {
            ConditionGroup::Condition(cond) => self.matches_condition(cond, article),
            ConditionGroup::All { conditions } => {
                conditions.iter().all(|g| self.matches_group(g, article))
            }
            ConditionGroup::Any { conditions } => {
                conditions.iter().any(|g| self.matches_group(g, article))
            }
        }
    }

    /// Evaluate a single leaf condition
    pub fn matches_condition(&self, cond: &Condition, article: &Article) -> bool {
        let text = cond.field.value_of(article);

        match cond.operator {
            Operator::IsEmpty => text.trim().is_empty(),
            Operator::IsNotEmpty => !text.trim().is_empty(),
            Operator::Regex => match self.pattern(&cond.value) {
                Ok(re) => re.is_match(text),
                Err(e) => {
                    warn!(pattern = %cond.value, error = %e, "Unusable rule pattern, treating as no match");
                    false
                }
            },
            op if self.case_sensitive => compare(op, text, &cond.value),
            op => compare(op, &text.to_lowercase(), &cond.value.to_lowercase()),
        }
    }
}

fn compare(op: Operator, text: &str, value: &str) -> bool {
    match op {
        Operator::Contains => text.contains(value),
        Operator::Equals => text == value,
        Operator::StartsWith => text.starts_with(value),
        Operator::EndsWith => text.ends_with(value),
        Operator::Regex | Operator::IsEmpty | Operator::IsNotEmpty => false,
    }
}
