//! Rule-tree evaluation against a canonical item.

use chrono::{DateTime, FixedOffset};

use super::{Condition, LeafValue, Operator, RuleLeaf, RuleNode};
use crate::item::{Item, ItemField};

impl RuleNode {
    /// Evaluates the tree against one item.
    ///
    /// Pure, total, and deterministic for any validated tree: an AND group is
    /// true over an empty rule list and short-circuits on the first false
    /// child; an OR group is false over an empty list and short-circuits on
    /// the first true child. A `true` result means the item is filtered out
    /// of the feed — rules express what to exclude, not what to keep.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            RuleNode::Group {
                condition: Condition::And,
                rules,
            } => rules.iter().all(|rule| rule.matches(item)),
            RuleNode::Group {
                condition: Condition::Or,
                rules,
            } => rules.iter().any(|rule| rule.matches(item)),
            RuleNode::Leaf(leaf) => leaf.matches(item),
        }
    }
}

impl RuleLeaf {
    /// Absent fields compare as the zero value of their type: `""` for
    /// strings, the Unix epoch for dates.
    fn matches(&self, item: &Item) -> bool {
        match &self.value {
            LeafValue::Text(expected) => {
                let actual = match self.field {
                    ItemField::Title => item.title.as_deref(),
                    ItemField::Description => item.description.as_deref(),
                    // Validation binds the date field to date-typed leaves
                    ItemField::Date => None,
                }
                .unwrap_or("");
                string_op(self.operator, actual, expected)
            }
            LeafValue::Date(expected) => {
                let actual = item.date.unwrap_or_else(epoch);
                date_op(self.operator, actual, *expected)
            }
        }
    }
}

fn string_op(operator: Operator, actual: &str, expected: &str) -> bool {
    match operator {
        Operator::Equal => actual == expected,
        Operator::NotEqual => actual != expected,
        Operator::Contains => actual.contains(expected),
        Operator::NotContains => !actual.contains(expected),
        // Ordering operators never pass validation for string leaves
        _ => false,
    }
}

fn date_op(operator: Operator, actual: DateTime<FixedOffset>, expected: DateTime<FixedOffset>) -> bool {
    match operator {
        Operator::Equal => actual == expected,
        Operator::NotEqual => actual != expected,
        Operator::Greater => actual > expected,
        Operator::Less => actual < expected,
        Operator::GreaterOrEqual => actual >= expected,
        Operator::LessOrEqual => actual <= expected,
        // Substring operators never pass validation for date leaves
        _ => false,
    }
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::UNIX_EPOCH.fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn string_leaf(field: ItemField, operator: Operator, value: &str) -> RuleNode {
        RuleNode::Leaf(RuleLeaf {
            field,
            label: field.as_str().to_string(),
            operator,
            value: LeafValue::Text(value.to_string()),
        })
    }

    fn date_leaf(operator: Operator, value: &str) -> RuleNode {
        RuleNode::Leaf(RuleLeaf {
            field: ItemField::Date,
            label: "date".to_string(),
            operator,
            value: LeafValue::Date(DateTime::parse_from_rfc3339(value).unwrap()),
        })
    }

    fn item_titled(title: &str) -> Item {
        Item {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_and_group_is_true() {
        let rule = RuleNode::Group {
            condition: Condition::And,
            rules: vec![],
        };
        assert!(rule.matches(&Item::default()));
    }

    #[test]
    fn test_empty_or_group_is_false() {
        let rule = RuleNode::Group {
            condition: Condition::Or,
            rules: vec![],
        };
        assert!(!rule.matches(&Item::default()));
    }

    #[test]
    fn test_string_operators() {
        let item = item_titled("Boring stuff");
        assert!(string_leaf(ItemField::Title, Operator::Equal, "Boring stuff").matches(&item));
        assert!(!string_leaf(ItemField::Title, Operator::Equal, "boring stuff").matches(&item));
        assert!(string_leaf(ItemField::Title, Operator::NotEqual, "other").matches(&item));
        assert!(string_leaf(ItemField::Title, Operator::Contains, "Boring").matches(&item));
        assert!(!string_leaf(ItemField::Title, Operator::Contains, "boring").matches(&item));
        assert!(string_leaf(ItemField::Title, Operator::NotContains, "Fun").matches(&item));
    }

    #[test]
    fn test_absent_string_field_compares_as_empty() {
        let item = Item::default();
        assert!(string_leaf(ItemField::Title, Operator::Equal, "").matches(&item));
        assert!(!string_leaf(ItemField::Title, Operator::Contains, "x").matches(&item));
        assert!(string_leaf(ItemField::Description, Operator::NotContains, "x").matches(&item));
    }

    #[test]
    fn test_date_operators() {
        let item = Item {
            date: Some(DateTime::parse_from_rfc3339("2021-06-15T00:00:00Z").unwrap()),
            ..Default::default()
        };
        assert!(date_leaf(Operator::Equal, "2021-06-15T00:00:00Z").matches(&item));
        assert!(date_leaf(Operator::Greater, "2021-06-01T00:00:00Z").matches(&item));
        assert!(date_leaf(Operator::Less, "2021-07-01T00:00:00Z").matches(&item));
        assert!(date_leaf(Operator::GreaterOrEqual, "2021-06-15T00:00:00Z").matches(&item));
        assert!(date_leaf(Operator::LessOrEqual, "2021-06-15T00:00:00Z").matches(&item));
        assert!(!date_leaf(Operator::NotEqual, "2021-06-15T00:00:00Z").matches(&item));
    }

    #[test]
    fn test_date_equality_across_offsets_compares_instants() {
        let item = Item {
            date: Some(DateTime::parse_from_rfc3339("2021-06-15T02:00:00+02:00").unwrap()),
            ..Default::default()
        };
        assert!(date_leaf(Operator::Equal, "2021-06-15T00:00:00Z").matches(&item));
    }

    #[test]
    fn test_absent_date_compares_as_epoch() {
        let item = Item::default();
        assert!(date_leaf(Operator::Less, "2021-01-01T00:00:00Z").matches(&item));
        assert!(date_leaf(Operator::Equal, "1970-01-01T00:00:00Z").matches(&item));
    }

    #[test]
    fn test_and_requires_all_children() {
        let item = item_titled("Boring stuff");
        let both = RuleNode::Group {
            condition: Condition::And,
            rules: vec![
                string_leaf(ItemField::Title, Operator::Contains, "Boring"),
                string_leaf(ItemField::Title, Operator::Contains, "stuff"),
            ],
        };
        let one = RuleNode::Group {
            condition: Condition::And,
            rules: vec![
                string_leaf(ItemField::Title, Operator::Contains, "Boring"),
                string_leaf(ItemField::Title, Operator::Contains, "missing"),
            ],
        };
        assert!(both.matches(&item));
        assert!(!one.matches(&item));
    }

    #[test]
    fn test_or_requires_any_child() {
        let item = item_titled("Boring stuff");
        let one = RuleNode::Group {
            condition: Condition::Or,
            rules: vec![
                string_leaf(ItemField::Title, Operator::Contains, "missing"),
                string_leaf(ItemField::Title, Operator::Contains, "stuff"),
            ],
        };
        let none = RuleNode::Group {
            condition: Condition::Or,
            rules: vec![
                string_leaf(ItemField::Title, Operator::Contains, "missing"),
                string_leaf(ItemField::Title, Operator::Contains, "absent"),
            ],
        };
        assert!(one.matches(&item));
        assert!(!none.matches(&item));
    }

    #[test]
    fn test_nested_groups() {
        let item = item_titled("Boring stuff");
        let rule = RuleNode::Group {
            condition: Condition::And,
            rules: vec![
                string_leaf(ItemField::Title, Operator::Contains, "stuff"),
                RuleNode::Group {
                    condition: Condition::Or,
                    rules: vec![
                        string_leaf(ItemField::Title, Operator::Contains, "missing"),
                        string_leaf(ItemField::Title, Operator::Contains, "Boring"),
                    ],
                },
            ],
        };
        assert!(rule.matches(&item));
    }

    proptest! {
        #[test]
        fn prop_contains_and_not_contains_are_complements(
            haystack in ".{0,64}",
            needle in ".{0,16}",
        ) {
            let item = item_titled(&haystack);
            let contains = string_leaf(ItemField::Title, Operator::Contains, &needle).matches(&item);
            let not_contains =
                string_leaf(ItemField::Title, Operator::NotContains, &needle).matches(&item);
            prop_assert_ne!(contains, not_contains);
        }

        #[test]
        fn prop_equal_and_not_equal_are_complements(
            haystack in ".{0,64}",
            needle in ".{0,64}",
        ) {
            let item = item_titled(&haystack);
            let equal = string_leaf(ItemField::Title, Operator::Equal, &needle).matches(&item);
            let not_equal = string_leaf(ItemField::Title, Operator::NotEqual, &needle).matches(&item);
            prop_assert_ne!(equal, not_equal);
        }

        #[test]
        fn prop_evaluation_is_deterministic(title in ".{0,64}", needle in ".{0,16}") {
            let item = item_titled(&title);
            let rule = string_leaf(ItemField::Title, Operator::Contains, &needle);
            prop_assert_eq!(rule.matches(&item), rule.matches(&item));
        }
    }
}
