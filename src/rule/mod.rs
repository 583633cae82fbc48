//! Boolean rule trees for feed filtering.
//!
//! A rule tree arrives as query-builder JSON:
//!
//! ```json
//! {"condition": "AND", "rules": [
//!   {"id": "title", "field": "Title", "type": "string", "input": "text",
//!    "operator": "contains", "value": "Boring"}
//! ]}
//! ```
//!
//! The raw JSON is validated exactly once, at configuration time, into the
//! typed [`RuleNode`] tree; evaluation (see [`eval`]) then cannot fail. Any
//! violation anywhere in the tree rejects the whole tree — there is no
//! partial acceptance. Validated trees are immutable and safe to share
//! read-only across concurrent evaluations.

mod eval;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::item::ItemField;

/// Why a submitted rule tree was rejected.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The submitted text was not valid JSON at all.
    #[error("Invalid rule JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Group condition other than exactly `"AND"` or `"OR"`.
    #[error("Invalid condition {0:?} (must be \"AND\" or \"OR\")")]
    InvalidCondition(String),

    /// Leaf `id` does not name a canonical item field.
    #[error("Unknown field id {0:?} (expected one of: title, date, description)")]
    UnknownField(String),

    /// Leaf `type` other than `"string"` or `"date"`.
    #[error("Unknown rule type {0:?} (must be \"string\" or \"date\")")]
    UnknownType(String),

    /// Operator not in the operator set of the leaf's type.
    #[error("Operator {operator:?} is not valid for type {kind:?}")]
    UnknownOperator { operator: String, kind: String },

    /// Leaf `type` does not fit the field it references.
    #[error("Field {field:?} cannot be compared as {kind:?}")]
    FieldTypeMismatch { field: &'static str, kind: String },

    /// Structural violation: a required key is absent.
    #[error("Rule node is missing required key {0:?}")]
    MissingKey(&'static str),

    /// Leaf `value` was not a JSON string.
    #[error("Rule value must be a string, got {0}")]
    InvalidValue(String),

    /// Date leaf whose value does not parse as a date literal.
    #[error("Unparseable date literal {0:?}")]
    InvalidDate(String),
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    And,
    Or,
}

impl Condition {
    /// Case-sensitive on purpose: the query-builder UI only ever emits
    /// uppercase, and anything else must be rejected here rather than
    /// silently coerced.
    fn parse(raw: &str) -> Result<Self, RuleError> {
        match raw {
            "AND" => Ok(Condition::And),
            "OR" => Ok(Condition::Or),
            other => Err(RuleError::InvalidCondition(other.to_string())),
        }
    }
}

/// Comparison applied by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

/// A leaf's comparison value, parsed according to the leaf's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    Text(String),
    Date(DateTime<FixedOffset>),
}

/// A single validated comparison against one item field.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleLeaf {
    pub field: ItemField,
    /// Feed-side label from the UI; informational only.
    pub label: String,
    pub operator: Operator,
    pub value: LeafValue,
}

/// A validated boolean rule tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Group {
        condition: Condition,
        rules: Vec<RuleNode>,
    },
    Leaf(RuleLeaf),
}

/// Untyped mirror of one node as submitted. A node with a `rules` key is a
/// group; anything else is a leaf. The UI-only `input` key is ignored.
#[derive(Debug, Deserialize)]
struct RawNode {
    condition: Option<String>,
    rules: Option<Vec<RawNode>>,
    id: Option<String>,
    field: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    operator: Option<String>,
    value: Option<serde_json::Value>,
}

impl RuleNode {
    /// Validates a raw JSON value into a rule tree.
    ///
    /// This is the one gate between user-authored JSON and the evaluator: it
    /// runs when a filter configuration is created or edited, never per item.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] found; the whole tree is rejected.
    pub fn validate(raw: &serde_json::Value) -> Result<RuleNode, RuleError> {
        let raw = RawNode::deserialize(raw)?;
        Self::from_raw(&raw)
    }

    /// Validates a rule tree straight from JSON text.
    pub fn from_json(json: &str) -> Result<RuleNode, RuleError> {
        let raw: RawNode = serde_json::from_str(json)?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &RawNode) -> Result<RuleNode, RuleError> {
        if let Some(rules) = &raw.rules {
            let condition = raw
                .condition
                .as_deref()
                .ok_or(RuleError::MissingKey("condition"))?;
            let condition = Condition::parse(condition)?;
            let rules = rules
                .iter()
                .map(Self::from_raw)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RuleNode::Group { condition, rules })
        } else {
            Self::leaf_from_raw(raw)
        }
    }

    fn leaf_from_raw(raw: &RawNode) -> Result<RuleNode, RuleError> {
        let id = raw.id.as_deref().ok_or(RuleError::MissingKey("id"))?;
        let field =
            ItemField::parse(id).ok_or_else(|| RuleError::UnknownField(id.to_string()))?;
        let kind = raw.kind.as_deref().ok_or(RuleError::MissingKey("type"))?;
        let operator = raw
            .operator
            .as_deref()
            .ok_or(RuleError::MissingKey("operator"))?;
        let value = raw.value.as_ref().ok_or(RuleError::MissingKey("value"))?;
        let text = value
            .as_str()
            .ok_or_else(|| RuleError::InvalidValue(value.to_string()))?;

        let (operator, value) = match kind {
            "string" => {
                if field == ItemField::Date {
                    return Err(RuleError::FieldTypeMismatch {
                        field: field.as_str(),
                        kind: kind.to_string(),
                    });
                }
                let op = match operator {
                    "equal" => Operator::Equal,
                    "not_equal" => Operator::NotEqual,
                    "contains" => Operator::Contains,
                    "not_contains" => Operator::NotContains,
                    other => {
                        return Err(RuleError::UnknownOperator {
                            operator: other.to_string(),
                            kind: kind.to_string(),
                        })
                    }
                };
                (op, LeafValue::Text(text.to_string()))
            }
            "date" => {
                if field != ItemField::Date {
                    return Err(RuleError::FieldTypeMismatch {
                        field: field.as_str(),
                        kind: kind.to_string(),
                    });
                }
                let op = match operator {
                    "equal" => Operator::Equal,
                    "not_equal" => Operator::NotEqual,
                    "greater" => Operator::Greater,
                    "less" => Operator::Less,
                    "greater_or_equal" => Operator::GreaterOrEqual,
                    "less_or_equal" => Operator::LessOrEqual,
                    other => {
                        return Err(RuleError::UnknownOperator {
                            operator: other.to_string(),
                            kind: kind.to_string(),
                        })
                    }
                };
                (op, LeafValue::Date(parse_date_literal(text)?))
            }
            other => return Err(RuleError::UnknownType(other.to_string())),
        };

        Ok(RuleNode::Leaf(RuleLeaf {
            field,
            label: raw
                .field
                .clone()
                .unwrap_or_else(|| field.as_str().to_string()),
            operator,
            value,
        }))
    }
}

/// Accepts RFC 3339, then `YYYY-MM-DD HH:MM:SS`, then bare `YYYY-MM-DD`
/// (midnight UTC) — the forms the query-builder date picker produces.
fn parse_date_literal(raw: &str) -> Result<DateTime<FixedOffset>, RuleError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().fixed_offset());
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc().fixed_offset());
    }
    Err(RuleError::InvalidDate(raw.to_string()))
}
