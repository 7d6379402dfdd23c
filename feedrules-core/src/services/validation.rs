//! Rule validation - the boundary where drafts become typed rules
//!
//! Id lists arrive as JSON strings and are parsed exactly once, here. Every
//! failure names the field it is about so callers can point at it.

use chrono::Utc;

use crate::config::EngineConfig;
use crate::domain::rule::MAX_RULE_NAME_LEN;
use crate::domain::{
    ActionType, Condition, ConditionGroup, IdSet, Operator, Rule, RuleAction, RuleDraft,
    RuleMatcher, RuleScope, ScopeType, ValidationError,
};
use crate::services::condition::compile_pattern;

type Checked<T> = std::result::Result<T, ValidationError>;

/// Structural validator for rule drafts
#[derive(Debug, Clone, Copy)]
pub struct RuleValidator {
    default_priority: i32,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl RuleValidator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            default_priority: config.default_priority,
        }
    }

    /// Validate a draft and build the typed rule it describes
    ///
    /// When `existing` is given (update path) the rule keeps its id, match
    /// count and creation time. Checks run in a fixed order and the first
    /// failure is returned.
    pub fn validate(&self, draft: &RuleDraft, existing: Option<&Rule>) -> Checked<Rule> {
        let name = validate_name(&draft.name)?;
        let scope = build_scope(draft)?;
        let action = build_action(draft)?;
        let matcher = build_matcher(draft)?;

        let priority = if draft.priority <= 0 {
            self.default_priority
        } else {
            draft.priority
        };

        let now = Utc::now();
        Ok(Rule {
            id: existing.map_or(0, |r| r.id),
            name,
            matcher,
            scope,
            action,
            enabled: draft.is_enabled,
            priority,
            stop_on_match: draft.stop_on_match,
            match_count: existing.map_or(0, |r| r.match_count),
            created_at: existing.map_or(now, |r| r.created_at),
            last_modified: now,
        })
    }

    /// Structural check only
    pub fn is_valid(&self, draft: &RuleDraft) -> bool {
        self.validate(draft, None).is_ok()
    }
}

fn validate_name(name: &str) -> Checked<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Name", "Name is required"));
    }
    if trimmed.chars().count() > MAX_RULE_NAME_LEN {
        return Err(ValidationError::new(
            "Name",
            format!("Name must be {} characters or fewer", MAX_RULE_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

fn build_scope(draft: &RuleDraft) -> Checked<RuleScope> {
    Ok(match draft.scope {
        ScopeType::AllFeeds => RuleScope::AllFeeds,
        ScopeType::SpecificFeeds => {
            RuleScope::SpecificFeeds(parse_id_list("FeedIds", draft.feed_ids.as_deref())?)
        }
        ScopeType::SpecificCategories => RuleScope::SpecificCategories(parse_id_list(
            "CategoryIds",
            draft.category_ids.as_deref(),
        )?),
    })
}

fn build_action(draft: &RuleDraft) -> Checked<RuleAction> {
    Ok(match draft.action_type {
        ActionType::MarkAsRead => RuleAction::MarkAsRead,
        ActionType::MarkAsStarred => RuleAction::MarkAsStarred,
        ActionType::MarkAsFavorite => RuleAction::MarkAsFavorite,
        ActionType::Notify => RuleAction::Notify,
        ActionType::ApplyTags => {
            RuleAction::ApplyTags(parse_id_list("TagIds", draft.tag_ids.as_deref())?)
        }
        ActionType::MoveToCategory => match draft.category_id {
            Some(id) if id > 0 => RuleAction::MoveToCategory(id),
            Some(_) => {
                return Err(ValidationError::new(
                    "CategoryId",
                    "CategoryId must be a positive id",
                ))
            }
            None => {
                return Err(ValidationError::new(
                    "CategoryId",
                    "CategoryId is required when action is MoveToCategory",
                ))
            }
        },
        ActionType::HighlightArticle => match draft.highlight_color.as_deref().map(str::trim) {
            Some(color) if !color.is_empty() => RuleAction::HighlightArticle(color.to_string()),
            _ => {
                return Err(ValidationError::new(
                    "HighlightColor",
                    "HighlightColor is required when action is HighlightArticle",
                ))
            }
        },
    })
}

fn build_matcher(draft: &RuleDraft) -> Checked<RuleMatcher> {
    if draft.uses_advanced_conditions {
        let group = draft.conditions.as_ref().ok_or_else(|| {
            ValidationError::new(
                "Conditions",
                "Conditions are required when advanced conditions are enabled",
            )
        })?;
        validate_group(group)?;
        return Ok(RuleMatcher::Advanced(group.clone()));
    }

    // Simple Regex rules take their pattern from the dedicated field
    let pattern = if draft.operator == Operator::Regex {
        let pattern = draft.regex_pattern.as_deref().unwrap_or_default();
        if pattern.is_empty() {
            return Err(ValidationError::new(
                "RegexPattern",
                "RegexPattern is required for Regex operator",
            ));
        }
        check_pattern("RegexPattern", pattern)?;
        Some(pattern)
    } else {
        None
    };

    let value = if draft.operator.requires_value() {
        let value = draft.value.as_deref().unwrap_or_default();
        if value.trim().is_empty() {
            return Err(ValidationError::new(
                "Value",
                format!("Value is required for operator {}", draft.operator.as_str()),
            ));
        }
        value
    } else {
        ""
    };

    Ok(RuleMatcher::Simple(Condition::new(
        draft.target_field,
        draft.operator,
        pattern.unwrap_or(value),
    )))
}

fn validate_group(group: &ConditionGroup) -> Checked<()> {
    match group {
        ConditionGroup::Condition(cond) => validate_leaf(cond),
        ConditionGroup::All { conditions } | ConditionGroup::Any { conditions } => {
            if conditions.is_empty() {
                return Err(ValidationError::new(
                    "Conditions",
                    "Condition groups must not be empty",
                ));
            }
            conditions.iter().try_for_each(validate_group)
        }
    }
}

fn validate_leaf(cond: &Condition) -> Checked<()> {
    if cond.operator.requires_value() && cond.value.trim().is_empty() {
        return Err(ValidationError::new(
            "Conditions",
            format!(
                "Condition on {} requires a value for operator {}",
                cond.field.as_str(),
                cond.operator.as_str()
            ),
        ));
    }
    if cond.operator == Operator::Regex {
        check_pattern("Conditions", &cond.value)?;
    }
    Ok(())
}

fn check_pattern(field: &str, pattern: &str) -> Checked<()> {
    compile_pattern(pattern, true).map(|_| ()).map_err(|e| {
        ValidationError::new(
            field,
            format!("{} is not a valid regular expression: {}", field, e),
        )
    })
}

/// Parse a JSON-encoded id array such as "[1, 2]"
fn parse_id_list(field: &str, raw: Option<&str>) -> Checked<IdSet> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ValidationError::new(field, format!("{} are required", field))),
    };

    let ids: Vec<i64> = serde_json::from_str(raw)
        .map_err(|_| ValidationError::new(field, format!("{} contains invalid JSON", field)))?;

    if ids.iter().any(|id| *id <= 0) {
        return Err(ValidationError::new(
            field,
            format!("{} must contain only positive ids", field),
        ));
    }

    Ok(IdSet::new(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetField;

    fn draft() -> RuleDraft {
        RuleDraft::new("AI news", TargetField::Title, Operator::Contains, ActionType::MarkAsRead)
            .with_value("AI")
    }

    fn field_of(result: Checked<Rule>) -> String {
        result.unwrap_err().field
    }

    #[test]
    fn test_valid_simple_draft() {
        let rule = RuleValidator::default().validate(&draft(), None).unwrap();
        assert_eq!(rule.id, 0);
        assert_eq!(rule.scope, RuleScope::AllFeeds);
        assert_eq!(rule.action, RuleAction::MarkAsRead);
        assert_eq!(
            rule.matcher,
            RuleMatcher::Simple(Condition::new(TargetField::Title, Operator::Contains, "AI"))
        );
    }

    #[test]
    fn test_blank_and_long_names() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.name = "   ".to_string();
        assert_eq!(field_of(v.validate(&d, None)), "Name");

        d.name = "x".repeat(MAX_RULE_NAME_LEN);
        assert!(v.validate(&d, None).is_ok());

        d.name = "x".repeat(MAX_RULE_NAME_LEN + 1);
        assert_eq!(field_of(v.validate(&d, None)), "Name");
    }

    #[test]
    fn test_feed_ids_required_and_well_formed() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.scope = ScopeType::SpecificFeeds;

        let err = v.validate(&d, None).unwrap_err();
        assert_eq!(err, ValidationError::new("FeedIds", "FeedIds are required"));

        d.feed_ids = Some("[1, 2".to_string());
        let err = v.validate(&d, None).unwrap_err();
        assert_eq!(err, ValidationError::new("FeedIds", "FeedIds contains invalid JSON"));

        d.feed_ids = Some("[\"a\"]".to_string());
        assert_eq!(v.validate(&d, None).unwrap_err().message, "FeedIds contains invalid JSON");

        d.feed_ids = Some("[0]".to_string());
        assert_eq!(field_of(v.validate(&d, None)), "FeedIds");

        d.feed_ids = Some("[2, 1, 2]".to_string());
        let rule = v.validate(&d, None).unwrap();
        assert_eq!(rule.scope, RuleScope::SpecificFeeds(IdSet::new([2, 1])));
    }

    #[test]
    fn test_id_lists_ignored_when_not_selected() {
        let mut d = draft();
        d.feed_ids = Some("not json".to_string());
        d.tag_ids = Some("{".to_string());
        assert!(RuleValidator::default().is_valid(&d));
    }

    #[test]
    fn test_category_ids_and_tag_ids() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.scope = ScopeType::SpecificCategories;
        d.category_ids = Some("nope".to_string());
        assert_eq!(
            v.validate(&d, None).unwrap_err().message,
            "CategoryIds contains invalid JSON"
        );

        let mut d = draft();
        d.action_type = ActionType::ApplyTags;
        assert_eq!(v.validate(&d, None).unwrap_err().message, "TagIds are required");
        d.tag_ids = Some("[5]".to_string());
        assert_eq!(
            v.validate(&d, None).unwrap().action,
            RuleAction::ApplyTags(IdSet::new([5]))
        );
    }

    #[test]
    fn test_action_payload_requirements() {
        let v = RuleValidator::default();

        let mut d = draft();
        d.action_type = ActionType::MoveToCategory;
        assert_eq!(field_of(v.validate(&d, None)), "CategoryId");
        d.category_id = Some(9);
        assert_eq!(v.validate(&d, None).unwrap().action, RuleAction::MoveToCategory(9));

        let mut d = draft();
        d.action_type = ActionType::HighlightArticle;
        d.highlight_color = Some("  ".to_string());
        assert_eq!(field_of(v.validate(&d, None)), "HighlightColor");
        d.highlight_color = Some("#ff0".to_string());
        assert_eq!(
            v.validate(&d, None).unwrap().action,
            RuleAction::HighlightArticle("#ff0".to_string())
        );
    }

    #[test]
    fn test_regex_reads_dedicated_pattern_field() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.operator = Operator::Regex;
        d.value = Some("ignored".to_string());
        assert_eq!(field_of(v.validate(&d, None)), "RegexPattern");

        d.regex_pattern = Some("(unclosed".to_string());
        assert_eq!(field_of(v.validate(&d, None)), "RegexPattern");

        d.regex_pattern = Some(r"^AI\b".to_string());
        let rule = v.validate(&d, None).unwrap();
        assert_eq!(
            rule.matcher,
            RuleMatcher::Simple(Condition::new(TargetField::Title, Operator::Regex, r"^AI\b"))
        );
    }

    #[test]
    fn test_regex_still_requires_value() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.operator = Operator::Regex;
        d.regex_pattern = Some("^AI".to_string());
        d.value = None;
        assert_eq!(field_of(v.validate(&d, None)), "Value");

        d.value = Some("AI headlines".to_string());
        let rule = v.validate(&d, None).unwrap();
        assert_eq!(
            rule.matcher,
            RuleMatcher::Simple(Condition::new(TargetField::Title, Operator::Regex, "^AI"))
        );
    }

    #[test]
    fn test_whitespace_value_is_blank() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.value = Some("   ".to_string());
        assert_eq!(field_of(v.validate(&d, None)), "Value");

        d.uses_advanced_conditions = true;
        d.conditions = Some(ConditionGroup::Condition(Condition::new(
            TargetField::Title,
            Operator::Contains,
            " \t",
        )));
        assert_eq!(field_of(v.validate(&d, None)), "Conditions");
    }

    #[test]
    fn test_value_required_unless_blankness_operator() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.value = None;
        assert_eq!(field_of(v.validate(&d, None)), "Value");

        d.operator = Operator::IsEmpty;
        assert!(v.is_valid(&d));
        d.operator = Operator::IsNotEmpty;
        assert!(v.is_valid(&d));
    }

    #[test]
    fn test_advanced_conditions_skip_simple_value_checks() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.value = None;
        d.operator = Operator::Regex;
        d.uses_advanced_conditions = true;
        assert_eq!(field_of(v.validate(&d, None)), "Conditions");

        d.conditions = Some(ConditionGroup::All { conditions: vec![] });
        assert_eq!(field_of(v.validate(&d, None)), "Conditions");

        d.conditions = Some(ConditionGroup::Any {
            conditions: vec![ConditionGroup::Condition(Condition::new(
                TargetField::Author,
                Operator::Equals,
                "",
            ))],
        });
        assert_eq!(field_of(v.validate(&d, None)), "Conditions");

        let group = ConditionGroup::Any {
            conditions: vec![
                ConditionGroup::Condition(Condition::new(TargetField::Title, Operator::Regex, "^AI")),
                ConditionGroup::Condition(Condition::new(TargetField::Author, Operator::IsEmpty, "")),
            ],
        };
        d.conditions = Some(group.clone());
        assert_eq!(v.validate(&d, None).unwrap().matcher, RuleMatcher::Advanced(group));
    }

    #[test]
    fn test_priority_normalization() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.priority = -5;
        assert_eq!(v.validate(&d, None).unwrap().priority, 100);
        d.priority = 0;
        assert_eq!(v.validate(&d, None).unwrap().priority, 100);
        d.priority = 3;
        assert_eq!(v.validate(&d, None).unwrap().priority, 3);

        let custom = RuleValidator::new(&EngineConfig {
            case_sensitive: true,
            default_priority: 40,
        });
        d.priority = 0;
        assert_eq!(custom.validate(&d, None).unwrap().priority, 40);
    }

    #[test]
    fn test_existing_rule_identity_carried_over() {
        let v = RuleValidator::default();
        let mut existing = v.validate(&draft(), None).unwrap();
        existing.id = 42;
        existing.match_count = 7;

        let mut d = draft();
        d.name = "Renamed".to_string();
        let updated = v.validate(&d, Some(&existing)).unwrap();
        assert_eq!(updated.id, 42);
        assert_eq!(updated.match_count, 7);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.name, "Renamed");
    }

    #[test]
    fn test_rule_to_draft_revalidates_to_same_shape() {
        let v = RuleValidator::default();
        let mut d = draft();
        d.scope = ScopeType::SpecificCategories;
        d.category_ids = Some("[3,4]".to_string());
        d.action_type = ActionType::ApplyTags;
        d.tag_ids = Some("[1]".to_string());
        d.priority = 5;
        let rule = v.validate(&d, None).unwrap();

        let again = v.validate(&rule.to_draft(), Some(&rule)).unwrap();
        assert_eq!(again.scope, rule.scope);
        assert_eq!(again.action, rule.action);
        assert_eq!(again.matcher, rule.matcher);
        assert_eq!(again.priority, 5);
    }
}
