//! Translation of structured filters into the store's native dialect.
//!
//! The translator only emits condition kinds the target store advertises.
//! Anything else is rejected with [`RetrievalError::UnsupportedFilter`]
//! rather than dropped, since a silently weakened filter returns documents
//! the user excluded.

use selfquery_core::{ConditionKind, DocumentStore, FilterCondition};
use selfquery_schema::{Comparator, FieldValue};
use serde_json::Value;

use crate::error::{Result, RetrievalError};
use crate::structured::{FilterNode, FilterValue, LogicalOperator};

/// Result of lowering one node
enum Lowered {
    /// Every document satisfies the node
    Unconstrained,
    Condition(FilterCondition),
}

/// Translates [`FilterNode`] trees for one store
#[derive(Debug, Clone)]
pub struct FilterTranslator {
    supported: Vec<ConditionKind>,
}

impl FilterTranslator {
    pub fn new(supported: impl IntoIterator<Item = ConditionKind>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }

    /// Translator for whatever `store` says it can evaluate
    pub fn for_store(store: &dyn DocumentStore) -> Self {
        Self::new(ConditionKind::ALL.into_iter().filter(|k| store.supports(*k)))
    }

    pub fn supports(&self, kind: ConditionKind) -> bool {
        self.supported.contains(&kind)
    }

    /// Translate an optional filter. `None` and filters that constrain
    /// nothing both translate to `None`.
    pub fn translate(&self, filter: Option<&FilterNode>) -> Result<Option<FilterCondition>> {
        let Some(node) = filter else {
            return Ok(None);
        };
        match self.lower(node)? {
            Lowered::Unconstrained => Ok(None),
            Lowered::Condition(condition) => Ok(Some(condition)),
        }
    }

    fn lower(&self, node: &FilterNode) -> Result<Lowered> {
        match node {
            FilterNode::Comparison { field, op, value } => self.lower_comparison(field, *op, value),
            FilterNode::Logical { op, children } => {
                let lowered = children
                    .iter()
                    .map(|child| self.lower(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(combine(*op, lowered))
            }
        }
    }

    fn lower_comparison(&self, field: &str, op: Comparator, value: &FilterValue) -> Result<Lowered> {
        // An empty exclusion list excludes nothing
        if op == Comparator::Nin && matches!(value, FilterValue::List(v) if v.is_empty()) {
            return Ok(Lowered::Unconstrained);
        }

        let kind = condition_kind(op);
        if !self.supports(kind) {
            return Err(RetrievalError::UnsupportedFilter(format!(
                "store cannot evaluate '{}' (used on field '{}')",
                op, field
            )));
        }

        let field = field.to_string();
        let condition = match op {
            Comparator::Eq => FilterCondition::Equals {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Ne => FilterCondition::NotEquals {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Gt => FilterCondition::GreaterThan {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Gte => FilterCondition::GreaterEqual {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Lt => FilterCondition::LessThan {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Lte => FilterCondition::LessEqual {
                value: single_value(op, &field, value)?,
                field,
            },
            Comparator::Like => match value {
                FilterValue::Single(FieldValue::String(pattern)) => FilterCondition::Like {
                    field,
                    pattern: pattern.clone(),
                },
                other => {
                    return Err(RetrievalError::UnsupportedFilter(format!(
                        "'like' on field '{}' needs a string pattern, got {}",
                        field, other
                    )))
                }
            },
            Comparator::In => FilterCondition::In {
                field,
                values: list_values(value),
            },
            Comparator::Nin => FilterCondition::NotIn {
                field,
                values: list_values(value),
            },
        };

        Ok(Lowered::Condition(condition))
    }
}

fn condition_kind(op: Comparator) -> ConditionKind {
    match op {
        Comparator::Eq => ConditionKind::Equals,
        Comparator::Ne => ConditionKind::NotEquals,
        Comparator::Gt => ConditionKind::GreaterThan,
        Comparator::Gte => ConditionKind::GreaterEqual,
        Comparator::Lt => ConditionKind::LessThan,
        Comparator::Lte => ConditionKind::LessEqual,
        Comparator::Like => ConditionKind::Like,
        Comparator::In => ConditionKind::In,
        Comparator::Nin => ConditionKind::NotIn,
    }
}

fn single_value(op: Comparator, field: &str, value: &FilterValue) -> Result<Value> {
    match value {
        FilterValue::Single(v) => Ok(v.to_json()),
        FilterValue::List(_) => Err(RetrievalError::UnsupportedFilter(format!(
            "'{}' on field '{}' takes a single value",
            op, field
        ))),
    }
}

fn list_values(value: &FilterValue) -> Vec<Value> {
    match value {
        FilterValue::Single(v) => vec![v.to_json()],
        FilterValue::List(values) => values.iter().map(FieldValue::to_json).collect(),
    }
}

/// Fold lowered children into one node. Single children collapse into
/// themselves so `and(x)` and `x` translate identically.
fn combine(op: LogicalOperator, children: Vec<Lowered>) -> Lowered {
    let unconstrained = children
        .iter()
        .any(|c| matches!(c, Lowered::Unconstrained));
    let mut conditions: Vec<FilterCondition> = children
        .into_iter()
        .filter_map(|c| match c {
            Lowered::Condition(condition) => Some(condition),
            Lowered::Unconstrained => None,
        })
        .collect();

    match op {
        LogicalOperator::And => match conditions.len() {
            0 => Lowered::Unconstrained,
            1 => Lowered::Condition(conditions.remove(0)),
            _ => Lowered::Condition(FilterCondition::And(conditions)),
        },
        LogicalOperator::Or => {
            if unconstrained || conditions.is_empty() {
                return Lowered::Unconstrained;
            }
            if conditions.len() == 1 {
                return Lowered::Condition(conditions.remove(0));
            }
            Lowered::Condition(FilterCondition::Or(conditions))
        }
        // not(a, b, ...) holds when none of the children hold
        LogicalOperator::Not => {
            if unconstrained {
                return Lowered::Condition(FilterCondition::match_none());
            }
            match conditions.len() {
                0 => Lowered::Unconstrained,
                1 => Lowered::Condition(FilterCondition::Not(Box::new(conditions.remove(0)))),
                _ => Lowered::Condition(FilterCondition::Not(Box::new(FilterCondition::Or(
                    conditions,
                )))),
            }
        }
    }
}
