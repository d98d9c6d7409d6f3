// Payload filter dialect understood by the in-memory document store
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::Document;

pub trait Filter: Send + Sync {
    fn matches(&self, document: &Document) -> bool;
}

pub struct PayloadFilter {
    condition: FilterCondition,
}

/// A predicate over document metadata.
///
/// Range conditions compare numbers numerically and strings
/// lexicographically, so ISO-8601 dates order correctly. A condition on a
/// missing field never matches, except `NotEquals`/`NotIn` which do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    LessThan { field: String, value: Value },
    GreaterEqual { field: String, value: Value },
    LessEqual { field: String, value: Value },
    /// Case-insensitive. `%` matches any run of characters and `_` exactly
    /// one; a pattern without wildcards is an unanchored substring.
    Like { field: String, pattern: String },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
}

/// Leaf condition kinds, used by stores to advertise what they can evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Like,
    In,
    NotIn,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 9] = [
        ConditionKind::Equals,
        ConditionKind::NotEquals,
        ConditionKind::GreaterThan,
        ConditionKind::LessThan,
        ConditionKind::GreaterEqual,
        ConditionKind::LessEqual,
        ConditionKind::Like,
        ConditionKind::In,
        ConditionKind::NotIn,
    ];
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionKind::Equals => "equals",
            ConditionKind::NotEquals => "not_equals",
            ConditionKind::GreaterThan => "greater_than",
            ConditionKind::LessThan => "less_than",
            ConditionKind::GreaterEqual => "greater_equal",
            ConditionKind::LessEqual => "less_equal",
            ConditionKind::Like => "like",
            ConditionKind::In => "in",
            ConditionKind::NotIn => "not_in",
        };
        f.write_str(name)
    }
}

impl FilterCondition {
    /// Condition that no document satisfies
    pub fn match_none() -> Self {
        FilterCondition::Or(Vec::new())
    }

    /// All leaf condition kinds used anywhere in this condition tree
    pub fn kinds(&self) -> Vec<ConditionKind> {
        let mut kinds = Vec::new();
        self.collect_kinds(&mut kinds);
        kinds
    }

    fn collect_kinds(&self, out: &mut Vec<ConditionKind>) {
        let kind = match self {
            FilterCondition::Equals { .. } => ConditionKind::Equals,
            FilterCondition::NotEquals { .. } => ConditionKind::NotEquals,
            FilterCondition::GreaterThan { .. } => ConditionKind::GreaterThan,
            FilterCondition::LessThan { .. } => ConditionKind::LessThan,
            FilterCondition::GreaterEqual { .. } => ConditionKind::GreaterEqual,
            FilterCondition::LessEqual { .. } => ConditionKind::LessEqual,
            FilterCondition::Like { .. } => ConditionKind::Like,
            FilterCondition::In { .. } => ConditionKind::In,
            FilterCondition::NotIn { .. } => ConditionKind::NotIn,
            FilterCondition::And(children) | FilterCondition::Or(children) => {
                for child in children {
                    child.collect_kinds(out);
                }
                return;
            }
            FilterCondition::Not(child) => {
                child.collect_kinds(out);
                return;
            }
        };
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
}

impl PayloadFilter {
    pub fn new(condition: FilterCondition) -> Self {
        Self { condition }
    }

    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    fn matches_condition(condition: &FilterCondition, document: &Document) -> bool {
        match condition {
            FilterCondition::Equals { field, value } => document
                .get(field)
                .map(|v| values_equal(v, value))
                .unwrap_or(false),
            FilterCondition::NotEquals { field, value } => document
                .get(field)
                .map(|v| !values_equal(v, value))
                .unwrap_or(true),
            FilterCondition::GreaterThan { field, value } => {
                Self::compare_field(document, field, value, |o| o == Ordering::Greater)
            }
            FilterCondition::LessThan { field, value } => {
                Self::compare_field(document, field, value, |o| o == Ordering::Less)
            }
            FilterCondition::GreaterEqual { field, value } => {
                Self::compare_field(document, field, value, |o| o != Ordering::Less)
            }
            FilterCondition::LessEqual { field, value } => {
                Self::compare_field(document, field, value, |o| o != Ordering::Greater)
            }
            FilterCondition::Like { field, pattern } => document
                .get(field)
                .and_then(|v| v.as_str())
                .map(|v| like_matches(v, pattern))
                .unwrap_or(false),
            FilterCondition::In { field, values } => document
                .get(field)
                .map(|v| values.iter().any(|candidate| values_equal(v, candidate)))
                .unwrap_or(false),
            FilterCondition::NotIn { field, values } => document
                .get(field)
                .map(|v| !values.iter().any(|candidate| values_equal(v, candidate)))
                .unwrap_or(true),
            FilterCondition::And(conditions) => conditions
                .iter()
                .all(|c| Self::matches_condition(c, document)),
            FilterCondition::Or(conditions) => conditions
                .iter()
                .any(|c| Self::matches_condition(c, document)),
            FilterCondition::Not(condition) => !Self::matches_condition(condition, document),
        }
    }

    fn compare_field(
        document: &Document,
        field: &str,
        value: &Value,
        accept: impl Fn(Ordering) -> bool,
    ) -> bool {
        document
            .get(field)
            .and_then(|v| compare_values(v, value))
            .map(accept)
            .unwrap_or(false)
    }
}

impl Filter for PayloadFilter {
    fn matches(&self, document: &Document) -> bool {
        Self::matches_condition(&self.condition, document)
    }
}

/// Numbers compare by value regardless of integer/float representation
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like_matches(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();

    if !pattern.contains(['%', '_']) {
        return value.contains(&pattern);
    }

    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    wildcard_match(&value, &pattern)
}

// Iterative matcher with single-star backtracking, O(n*m) worst case
fn wildcard_match(value: &[char], pattern: &[char]) -> bool {
    let (mut v, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == value[v]) {
            v += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, v));
            p += 1;
        } else if let Some((star_p, star_v)) = star {
            p = star_p + 1;
            v = star_v + 1;
            star = Some((star_p, star_v + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
