//! Backend-neutral structured query representation.
//!
//! A [`StructuredQuery`] is what the language model's answer turns into once
//! it has been parsed and validated: residual semantic text, an optional
//! filter tree and an optional result limit.

use selfquery_schema::{Comparator, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value written by a model when a query has no filter
pub const NO_FILTER: &str = "NO_FILTER";

/// Logical operators combining filter nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
    /// Negates the disjunction of its children
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
            LogicalOperator::Not => "not",
        }
    }

    /// Case-insensitive lookup of an operator name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "and" => Some(LogicalOperator::And),
            "or" => Some(LogicalOperator::Or),
            "not" => Some(LogicalOperator::Not),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Single(FieldValue),
    /// Only used with `in` / `nin`
    List(Vec<FieldValue>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Single(value) => write!(f, "{}", value),
            FilterValue::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<FieldValue> for FilterValue {
    fn from(value: FieldValue) -> Self {
        FilterValue::Single(value)
    }
}

impl From<Vec<FieldValue>> for FilterValue {
    fn from(values: Vec<FieldValue>) -> Self {
        FilterValue::List(values)
    }
}

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Comparison {
        field: String,
        op: Comparator,
        value: FilterValue,
    },
    Logical {
        op: LogicalOperator,
        children: Vec<FilterNode>,
    },
}

impl FilterNode {
    pub fn comparison(field: impl Into<String>, op: Comparator, value: impl Into<FilterValue>) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::Or,
            children,
        }
    }

    pub fn not(child: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOperator::Not,
            children: vec![child],
        }
    }

    /// Names of every field referenced in this tree, in order of appearance
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterNode::Comparison { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field.as_str());
                }
            }
            FilterNode::Logical { children, .. } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }
}

/// Renders in the function-call syntax the parser reads
impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Comparison { field, op, value } => {
                write!(f, "{}({:?}, {})", op, field, value)
            }
            FilterNode::Logical { op, children } => {
                write!(f, "{}(", op)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A validated structured query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredQuery {
    /// Residual text used for semantic similarity. May be empty.
    pub query: String,
    /// `None` means no filtering
    pub filter: Option<FilterNode>,
    /// `None` means the caller's default limit
    pub limit: Option<usize>,
}

impl StructuredQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter: None,
            limit: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter rendered as an expression string, or [`NO_FILTER`]
    pub fn filter_expression(&self) -> String {
        self.filter
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_else(|| NO_FILTER.to_string())
    }

    /// JSON answer in the shape a language model is asked to produce
    pub fn to_model_output(&self) -> String {
        let raw = RawStructuredQuery::from(self);
        serde_json::to_string_pretty(&raw).unwrap_or_default()
    }
}

impl Serialize for StructuredQuery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawStructuredQuery::from(self).serialize(serializer)
    }
}

/// Wire shape of a structured query before validation
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawStructuredQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<serde_json::Value>,
}

impl From<&StructuredQuery> for RawStructuredQuery {
    fn from(query: &StructuredQuery) -> Self {
        RawStructuredQuery {
            query: Some(query.query.clone()),
            filter: Some(query.filter_expression()),
            limit: query.limit.map(serde_json::Value::from),
        }
    }
}
