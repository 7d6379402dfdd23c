//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use feedrules_core::{Condition, ConditionGroup, Rule, RuleAction, RuleMatcher, RuleScope};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One row per rule, in the order given
pub fn rules_table(rules: &[Rule]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "On", "Priority", "Condition", "Scope", "Action", "Matches"]);
    for rule in rules {
        let mut name = rule.name.clone();
        if rule.stop_on_match {
            name.push_str(" (stop)");
        }
        table.add_row(vec![
            rule.id.to_string(),
            name,
            if rule.enabled { "yes" } else { "no" }.to_string(),
            rule.priority.to_string(),
            describe_matcher(&rule.matcher),
            describe_scope(&rule.scope),
            describe_action(&rule.action),
            rule.match_count.to_string(),
        ]);
    }
    table
}

pub fn describe_matcher(matcher: &RuleMatcher) -> String {
    match matcher {
        RuleMatcher::Simple(cond) => describe_condition(cond),
        RuleMatcher::Advanced(group) => describe_group(group),
    }
}

fn describe_group(group: &ConditionGroup) -> String {
    match group {
        ConditionGroup::Condition(cond) => describe_condition(cond),
        ConditionGroup::All { conditions } => join_group(conditions, " AND "),
        ConditionGroup::Any { conditions } => join_group(conditions, " OR "),
    }
}

fn join_group(conditions: &[ConditionGroup], sep: &str) -> String {
    let parts: Vec<String> = conditions.iter().map(describe_group).collect();
    format!("({})", parts.join(sep))
}

fn describe_condition(cond: &Condition) -> String {
    if cond.operator.requires_value() {
        format!("{} {} \"{}\"", cond.field.as_str(), cond.operator.as_str(), cond.value)
    } else {
        format!("{} {}", cond.field.as_str(), cond.operator.as_str())
    }
}

pub fn describe_scope(scope: &RuleScope) -> String {
    match scope {
        RuleScope::AllFeeds => "all feeds".to_string(),
        RuleScope::SpecificFeeds(ids) => format!("feeds {}", ids.to_json()),
        RuleScope::SpecificCategories(ids) => format!("categories {}", ids.to_json()),
    }
}

pub fn describe_action(action: &RuleAction) -> String {
    match action {
        RuleAction::ApplyTags(ids) => format!("ApplyTags {}", ids.to_json()),
        RuleAction::MoveToCategory(id) => format!("MoveToCategory {}", id),
        RuleAction::HighlightArticle(color) => format!("HighlightArticle {}", color),
        other => other.action_type().as_str().to_string(),
    }
}
