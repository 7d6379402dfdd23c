//! Scope filtering - which feeds a rule may touch

use crate::domain::{Article, Feed, Rule, RuleScope};

/// Whether the rule's scope covers the article, given the article's resolved feed
pub fn in_scope(rule: &Rule, article: &Article, feed: &Feed) -> bool {
    match &rule.scope {
        RuleScope::AllFeeds => true,
        RuleScope::SpecificFeeds(feed_ids) => feed_ids.contains(article.feed_id),
        // An uncategorized feed is outside every category scope
        RuleScope::SpecificCategories(category_ids) => feed
            .category_id
            .map_or(false, |category_id| category_ids.contains(category_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionType, IdSet, Operator, RuleDraft, TargetField};
    use crate::services::RuleValidator;

    fn rule_with_scope(scope: RuleScope) -> Rule {
        let draft = RuleDraft::new("r", TargetField::Title, Operator::Contains, ActionType::Notify)
            .with_value("x");
        let mut rule = RuleValidator::default().validate(&draft, None).unwrap();
        rule.scope = scope;
        rule
    }

    #[test]
    fn test_all_feeds_always_in_scope() {
        let rule = rule_with_scope(RuleScope::AllFeeds);
        let feed = Feed::new(5, "f", "u");
        assert!(in_scope(&rule, &Article::new(1, 5, "t"), &feed));
    }

    #[test]
    fn test_specific_feeds_uses_article_feed_id() {
        let rule = rule_with_scope(RuleScope::SpecificFeeds(IdSet::new([1])));
        let feed = Feed::new(2, "f", "u");
        assert!(!in_scope(&rule, &Article::new(1, 2, "t"), &feed));

        let feed = Feed::new(1, "f", "u");
        assert!(in_scope(&rule, &Article::new(1, 1, "t"), &feed));
    }

    #[test]
    fn test_specific_categories_uses_feed_category() {
        let rule = rule_with_scope(RuleScope::SpecificCategories(IdSet::new([3, 4])));
        let article = Article::new(1, 1, "t");

        assert!(in_scope(&rule, &article, &Feed::new(1, "f", "u").with_category(4)));
        assert!(!in_scope(&rule, &article, &Feed::new(1, "f", "u").with_category(9)));
        assert!(!in_scope(&rule, &article, &Feed::new(1, "f", "u")));
    }
}
