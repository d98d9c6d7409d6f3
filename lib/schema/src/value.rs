//! Literal values and their coercion to declared field types.
//!
//! A [`Literal`] is what a filter expression spells out; a [`FieldValue`] is
//! that literal after it has been checked and converted against a field's
//! [`SemanticType`].

use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;

use crate::schema::{SchemaError, SemanticType};

/// Date format used for date literals and stored date metadata
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An untyped literal as written in a filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// An explicitly tagged date, e.g. `{"date": "2009-12-25", "type": "date"}`
    Date(String),
}

/// A literal converted to a field's declared type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Date(d) => write!(f, "{{\"date\": {:?}, \"type\": \"date\"}}", d),
        }
    }
}

/// Renders in the filter expression syntax, so a displayed value parses back
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{:?}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{:?}", x),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(
                f,
                "{{\"date\": \"{}\", \"type\": \"date\"}}",
                d.format(DATE_FORMAT)
            ),
        }
    }
}

impl FieldValue {
    /// JSON form matching how documents store metadata. Dates become
    /// `YYYY-MM-DD` strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(x) => Value::from(*x),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        }
    }
}

impl SemanticType {
    /// Convert a literal to this type.
    ///
    /// Numeric strings are accepted for numeric fields (`"8.5"` for a float),
    /// integral floats for integer fields, `"true"`/`"false"` for booleans and
    /// `YYYY-MM-DD` strings for dates. Anything else is an error.
    pub fn coerce(&self, literal: &Literal) -> Result<FieldValue, SchemaError> {
        let invalid = || SchemaError::InvalidLiteral {
            expected: *self,
            literal: literal.to_string(),
        };

        match self {
            SemanticType::String => match literal {
                Literal::String(s) | Literal::Date(s) => Ok(FieldValue::String(s.clone())),
                Literal::Integer(i) => Ok(FieldValue::String(i.to_string())),
                Literal::Float(x) => Ok(FieldValue::String(x.to_string())),
                Literal::Boolean(b) => Ok(FieldValue::String(b.to_string())),
            },
            SemanticType::Integer => match literal {
                Literal::Integer(i) => Ok(FieldValue::Integer(*i)),
                Literal::Float(x) => integral(*x).map(FieldValue::Integer).ok_or_else(invalid),
                Literal::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(integral))
                        .map(FieldValue::Integer)
                        .ok_or_else(invalid)
                }
                Literal::Boolean(_) | Literal::Date(_) => Err(invalid()),
            },
            SemanticType::Float => match literal {
                Literal::Integer(i) => Ok(FieldValue::Float(*i as f64)),
                Literal::Float(x) if x.is_finite() => Ok(FieldValue::Float(*x)),
                Literal::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .map(FieldValue::Float)
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            },
            SemanticType::Boolean => match literal {
                Literal::Boolean(b) => Ok(FieldValue::Boolean(*b)),
                Literal::String(s) if s.trim().eq_ignore_ascii_case("true") => {
                    Ok(FieldValue::Boolean(true))
                }
                Literal::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                    Ok(FieldValue::Boolean(false))
                }
                _ => Err(invalid()),
            },
            SemanticType::Date => match literal {
                Literal::Date(s) | Literal::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .map(FieldValue::Date)
                    .map_err(|_| invalid()),
                _ => Err(invalid()),
            },
        }
    }

    /// Whether a stored JSON metadata value has this type
    pub fn accepts_json(&self, value: &Value) -> bool {
        match self {
            SemanticType::String => value.is_string(),
            SemanticType::Integer => value.is_i64() || value.is_u64(),
            SemanticType::Float => value.is_number(),
            SemanticType::Boolean => value.is_boolean(),
            SemanticType::Date => value
                .as_str()
                .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
                .unwrap_or(false),
        }
    }
}

fn integral(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x <= i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}
