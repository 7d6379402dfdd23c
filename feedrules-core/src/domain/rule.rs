//! Rule domain entity
//!
//! Two shapes live here. [`RuleDraft`] is what callers hand in: flat fields,
//! id lists as JSON-encoded strings. [`Rule`] is the validated form the engine
//! works with, where scope, action and condition are tagged variants that only
//! carry the payload they need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Article;

/// Maximum length of a rule name, in characters
pub const MAX_RULE_NAME_LEN: usize = 200;

/// Priority given to rules created with a non-positive priority
pub const DEFAULT_PRIORITY: i32 = 100;

/// Article field a condition reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetField {
    Title,
    Content,
    Summary,
    Author,
    Categories,
    Link,
}

impl TargetField {
    /// Text of this field on the given article
    pub fn value_of<'a>(&self, article: &'a Article) -> &'a str {
        match self {
            TargetField::Title => &article.title,
            TargetField::Content => &article.content,
            TargetField::Summary => &article.summary,
            TargetField::Author => &article.author,
            TargetField::Categories => &article.categories,
            TargetField::Link => &article.link,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Title => "Title",
            TargetField::Content => "Content",
            TargetField::Summary => "Summary",
            TargetField::Author => "Author",
            TargetField::Categories => "Categories",
            TargetField::Link => "Link",
        }
    }
}

/// Comparison applied to a field's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    Regex,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    /// Whether the operator compares against a value (everything but the blankness checks)
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Contains => "Contains",
            Operator::Equals => "Equals",
            Operator::StartsWith => "StartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::Regex => "Regex",
            Operator::IsEmpty => "IsEmpty",
            Operator::IsNotEmpty => "IsNotEmpty",
        }
    }
}

/// Kind of action a draft asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    MarkAsRead,
    MarkAsStarred,
    MarkAsFavorite,
    ApplyTags,
    MoveToCategory,
    HighlightArticle,
    Notify,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::MarkAsRead => "MarkAsRead",
            ActionType::MarkAsStarred => "MarkAsStarred",
            ActionType::MarkAsFavorite => "MarkAsFavorite",
            ActionType::ApplyTags => "ApplyTags",
            ActionType::MoveToCategory => "MoveToCategory",
            ActionType::HighlightArticle => "HighlightArticle",
            ActionType::Notify => "Notify",
        }
    }
}

/// Kind of scope a draft asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeType {
    #[default]
    AllFeeds,
    SpecificFeeds,
    SpecificCategories,
}

/// Ordered set of positive ids, de-duplicated on construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<i64>")]
pub struct IdSet(Vec<i64>);

impl IdSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut out: Vec<i64> = Vec::new();
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON array text, the form drafts carry id lists in
    pub fn to_json(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        format!("[{}]", parts.join(","))
    }
}

impl From<Vec<i64>> for IdSet {
    fn from(ids: Vec<i64>) -> Self {
        Self::new(ids)
    }
}

impl From<IdSet> for Vec<i64> {
    fn from(ids: IdSet) -> Self {
        ids.0
    }
}

impl FromIterator<i64> for IdSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A single field comparison, the leaf of every match
///
/// For `Regex` the value is the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: TargetField,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl Condition {
    pub fn new(field: TargetField, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

/// Compound condition tree (AND/OR nodes over leaf conditions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConditionGroup {
    Condition(Condition),
    All { conditions: Vec<ConditionGroup> },
    Any { conditions: Vec<ConditionGroup> },
}

/// How a rule decides whether an article matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "condition", rename_all = "camelCase")]
pub enum RuleMatcher {
    Simple(Condition),
    Advanced(ConditionGroup),
}

/// Which feeds a rule may apply to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ids")]
pub enum RuleScope {
    AllFeeds,
    SpecificFeeds(IdSet),
    SpecificCategories(IdSet),
}

impl RuleScope {
    pub fn scope_type(&self) -> ScopeType {
        match self {
            RuleScope::AllFeeds => ScopeType::AllFeeds,
            RuleScope::SpecificFeeds(_) => ScopeType::SpecificFeeds,
            RuleScope::SpecificCategories(_) => ScopeType::SpecificCategories,
        }
    }
}

/// Mutation applied when a rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RuleAction {
    MarkAsRead,
    MarkAsStarred,
    MarkAsFavorite,
    ApplyTags(IdSet),
    MoveToCategory(i64),
    HighlightArticle(String),
    Notify,
}

impl RuleAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            RuleAction::MarkAsRead => ActionType::MarkAsRead,
            RuleAction::MarkAsStarred => ActionType::MarkAsStarred,
            RuleAction::MarkAsFavorite => ActionType::MarkAsFavorite,
            RuleAction::ApplyTags(_) => ActionType::ApplyTags,
            RuleAction::MoveToCategory(_) => ActionType::MoveToCategory,
            RuleAction::HighlightArticle(_) => ActionType::HighlightArticle,
            RuleAction::Notify => ActionType::Notify,
        }
    }
}

/// A validated automation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Store-assigned id (0 until inserted)
    pub id: i64,
    pub name: String,
    pub matcher: RuleMatcher,
    pub scope: RuleScope,
    pub action: RuleAction,
    pub enabled: bool,
    /// Lower value runs first
    pub priority: i32,
    pub stop_on_match: bool,
    pub match_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Rule {
    pub fn uses_advanced_conditions(&self) -> bool {
        matches!(self.matcher, RuleMatcher::Advanced(_))
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }

    /// Sort key used everywhere rules are ordered: priority, then id
    pub fn precedence(&self) -> (i32, i64) {
        (self.priority, self.id)
    }

    /// Order rules by ascending priority, ties broken by ascending id
    pub fn sort_by_precedence(rules: &mut [Rule]) {
        rules.sort_by_key(Rule::precedence);
    }

    /// Flatten back into the draft shape (for editing and re-validation)
    pub fn to_draft(&self) -> RuleDraft {
        let mut draft = match &self.matcher {
            RuleMatcher::Simple(cond) => {
                let mut draft = RuleDraft::new(
                    self.name.clone(),
                    cond.field,
                    cond.operator,
                    self.action_type(),
                );
                if cond.operator == Operator::Regex {
                    draft.regex_pattern = Some(cond.value.clone());
                }
                if cond.operator.requires_value() {
                    draft.value = Some(cond.value.clone());
                }
                draft
            }
            RuleMatcher::Advanced(group) => {
                let mut draft = RuleDraft::new(
                    self.name.clone(),
                    TargetField::Title,
                    Operator::Contains,
                    self.action_type(),
                );
                draft.uses_advanced_conditions = true;
                draft.conditions = Some(group.clone());
                draft
            }
        };

        draft.is_enabled = self.enabled;
        draft.priority = self.priority;
        draft.stop_on_match = self.stop_on_match;
        draft.scope = self.scope.scope_type();
        match &self.scope {
            RuleScope::AllFeeds => {}
            RuleScope::SpecificFeeds(ids) => draft.feed_ids = Some(ids.to_json()),
            RuleScope::SpecificCategories(ids) => draft.category_ids = Some(ids.to_json()),
        }
        match &self.action {
            RuleAction::ApplyTags(ids) => draft.tag_ids = Some(ids.to_json()),
            RuleAction::MoveToCategory(id) => draft.category_id = Some(*id),
            RuleAction::HighlightArticle(color) => draft.highlight_color = Some(color.clone()),
            _ => {}
        }
        draft
    }
}

fn default_enabled() -> bool {
    true
}

/// Rule definition as submitted by a caller, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub name: String,
    pub target_field: TargetField,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub regex_pattern: Option<String>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub priority: i32,
    pub action_type: ActionType,
    #[serde(default)]
    pub scope: ScopeType,
    /// JSON array of feed ids, e.g. "[1,2]"
    #[serde(default)]
    pub feed_ids: Option<String>,
    /// JSON array of category ids
    #[serde(default)]
    pub category_ids: Option<String>,
    /// JSON array of tag ids
    #[serde(default)]
    pub tag_ids: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub highlight_color: Option<String>,
    #[serde(default)]
    pub stop_on_match: bool,
    #[serde(default)]
    pub uses_advanced_conditions: bool,
    #[serde(default)]
    pub conditions: Option<ConditionGroup>,
}

impl RuleDraft {
    /// Minimal enabled, all-feeds draft
    pub fn new(
        name: impl Into<String>,
        target_field: TargetField,
        operator: Operator,
        action_type: ActionType,
    ) -> Self {
        Self {
            name: name.into(),
            target_field,
            operator,
            value: None,
            regex_pattern: None,
            is_enabled: true,
            priority: 0,
            action_type,
            scope: ScopeType::AllFeeds,
            feed_ids: None,
            category_ids: None,
            tag_ids: None,
            category_id: None,
            highlight_color: None,
            stop_on_match: false,
            uses_advanced_conditions: false,
            conditions: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_set_dedupes_and_keeps_order() {
        let ids = IdSet::new([3, 1, 3, 2, 1]);
        assert_eq!(ids.as_slice(), &[3, 1, 2]);
        assert_eq!(ids.to_json(), "[3,1,2]");
        assert!(ids.contains(2));
        assert!(!ids.contains(4));
    }

    #[test]
    fn test_operator_requires_value() {
        assert!(Operator::Contains.requires_value());
        assert!(Operator::Regex.requires_value());
        assert!(!Operator::IsEmpty.requires_value());
        assert!(!Operator::IsNotEmpty.requires_value());
    }

    #[test]
    fn test_draft_deserializes_from_camel_case() {
        let json = r#"{
            "name": "AI",
            "targetField": "Title",
            "operator": "Contains",
            "value": "AI",
            "actionType": "ApplyTags",
            "scope": "SpecificFeeds",
            "feedIds": "[1, 2]",
            "tagIds": "[7]"
        }"#;
        let draft: RuleDraft = serde_json::from_str(json).unwrap();
        assert!(draft.is_enabled);
        assert_eq!(draft.priority, 0);
        assert_eq!(draft.scope, ScopeType::SpecificFeeds);
        assert_eq!(draft.feed_ids.as_deref(), Some("[1, 2]"));
        assert_eq!(draft.action_type, ActionType::ApplyTags);
    }

    #[test]
    fn test_condition_group_json_shape() {
        let json = r#"{
            "type": "any",
            "conditions": [
                {"type": "condition", "field": "Title", "operator": "Contains", "value": "rust"},
                {"type": "all", "conditions": [
                    {"type": "condition", "field": "Author", "operator": "IsNotEmpty"}
                ]}
            ]
        }"#;
        let group: ConditionGroup = serde_json::from_str(json).unwrap();
        match group {
            ConditionGroup::Any { conditions } => {
                assert_eq!(conditions.len(), 2);
                assert_eq!(
                    conditions[0],
                    ConditionGroup::Condition(Condition::new(
                        TargetField::Title,
                        Operator::Contains,
                        "rust"
                    ))
                );
            }
            other => panic!("unexpected group: {:?}", other),
        }
    }

    #[test]
    fn test_scope_and_action_round_trip_through_json() {
        let scope = RuleScope::SpecificCategories(IdSet::new([4, 5]));
        let text = serde_json::to_string(&scope).unwrap();
        assert_eq!(serde_json::from_str::<RuleScope>(&text).unwrap(), scope);

        let action = RuleAction::HighlightArticle("#ffcc00".to_string());
        let text = serde_json::to_string(&action).unwrap();
        assert_eq!(serde_json::from_str::<RuleAction>(&text).unwrap(), action);
    }
}
