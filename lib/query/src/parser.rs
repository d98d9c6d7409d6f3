//! Structured query parser.
//!
//! Turns a model answer into a validated [`StructuredQuery`]. The answer is
//! expected to hold a JSON object, optionally inside a markdown code fence or
//! surrounded by prose. Its `filter` member is an expression in function-call
//! syntax (grammar in `filter.pest`):
//!
//! ```text
//! and(gt("rating", 8.0), in("genre", ["comedy", "drama"]))
//! ```
//!
//! Every comparison is checked against the [`Schema`]: the field must be
//! declared, the comparator legal for its type and the value coercible to
//! it. Any violation is a [`RetrievalError::MalformedQuery`]; no partial
//! query is ever returned.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use selfquery_schema::{Comparator, FieldValue, Literal, Schema};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::structured::{FilterNode, FilterValue, LogicalOperator, RawStructuredQuery, StructuredQuery, NO_FILTER};

/// Deepest filter nesting accepted before the expression is rejected
pub const MAX_FILTER_DEPTH: usize = 128;

#[derive(Parser)]
#[grammar = "src/filter.pest"]
struct FilterGrammar;

fn malformed(message: impl Into<String>) -> RetrievalError {
    RetrievalError::MalformedQuery(message.into())
}

/// Parser for model answers against a fixed schema
pub struct StructuredQueryParser<'a> {
    schema: &'a Schema,
}

impl<'a> StructuredQueryParser<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Parse and validate a raw model answer
    pub fn parse(&self, raw: &str) -> Result<StructuredQuery> {
        let parsed = decode_answer(raw)?;

        let query = parsed.query.unwrap_or_default().trim().to_string();
        let filter = match parsed.filter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(expr) if expr.eq_ignore_ascii_case(NO_FILTER) => None,
            Some(expr) => Some(self.parse_filter(expr)?),
        };
        let limit = parse_limit(parsed.limit.as_ref())?;

        let structured = StructuredQuery { query, filter, limit };
        debug!(
            "Parsed structured query: query={:?} filter={} limit={:?}",
            structured.query,
            structured.filter_expression(),
            structured.limit
        );
        Ok(structured)
    }

    /// Parse and validate a filter expression on its own
    pub fn parse_filter(&self, expr: &str) -> Result<FilterNode> {
        let mut pairs = FilterGrammar::parse(Rule::filter, expr)
            .map_err(|e| malformed(format!("invalid filter expression: {}", e)))?;

        let root = next_pair(&mut pairs, "filter expression")?;
        let node = next_pair(&mut root.into_inner(), "filter expression")?;
        self.lower(node, 0)
    }

    fn lower(&self, pair: Pair<'_, Rule>, depth: usize) -> Result<FilterNode> {
        if depth > MAX_FILTER_DEPTH {
            return Err(malformed("filter is nested too deeply"));
        }

        match pair.as_rule() {
            Rule::logical => {
                let mut inner = pair.into_inner();
                let name = next_pair(&mut inner, "logical operator")?;
                let op = LogicalOperator::from_name(name.as_str()).ok_or_else(|| {
                    malformed(format!("unknown logical operator '{}'", name.as_str()))
                })?;
                let children = inner
                    .map(|child| self.lower(child, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(FilterNode::Logical { op, children })
            }
            Rule::comparison => {
                let mut inner = pair.into_inner();
                let op: Comparator = next_pair(&mut inner, "comparator")?
                    .as_str()
                    .parse()
                    .map_err(malformed)?;
                let field = text(next_pair(&mut inner, "field name")?);
                let literal = literal_value(next_pair(&mut inner, "value")?)?;
                self.comparison(field, op, literal)
            }
            rule => Err(malformed(format!("unexpected {:?} in filter", rule))),
        }
    }

    fn comparison(&self, field: String, op: Comparator, literal: LiteralValue) -> Result<FilterNode> {
        let spec = self
            .schema
            .field(&field)
            .ok_or_else(|| malformed(format!("unknown field '{}'", field)))?;
        let semantic_type = spec.semantic_type;

        if !semantic_type.supports(op) {
            return Err(malformed(format!(
                "comparator '{}' cannot be used with {} field '{}'",
                op, semantic_type, field
            )));
        }

        let coerce = |literal: &Literal| -> Result<FieldValue> {
            semantic_type
                .coerce(literal)
                .map_err(|e| malformed(format!("field '{}': {}", field, e)))
        };

        let value = match (op.takes_list(), literal) {
            (true, LiteralValue::List(items)) => {
                FilterValue::List(items.iter().map(coerce).collect::<Result<Vec<_>>>()?)
            }
            (true, LiteralValue::Single(item)) => FilterValue::List(vec![coerce(&item)?]),
            (false, LiteralValue::Single(item)) => FilterValue::Single(coerce(&item)?),
            (false, LiteralValue::List(_)) => {
                return Err(malformed(format!(
                    "comparator '{}' takes a single value, not a list",
                    op
                )))
            }
        };

        Ok(FilterNode::Comparison { field, op, value })
    }
}

/// Decode the JSON object of a model answer.
///
/// Prefers the first object inside a markdown code fence, then the first
/// object anywhere in the answer. Text after the object is ignored.
fn decode_answer(raw: &str) -> Result<RawStructuredQuery> {
    let decoded = fenced_block(raw)
        .and_then(first_object)
        .or_else(|| first_object(raw));

    match decoded {
        Some(Ok(parsed)) => Ok(parsed),
        Some(Err(e)) => Err(malformed(format!("invalid structured query JSON: {}", e))),
        None => Err(malformed("no JSON object found in model output")),
    }
}

fn first_object(text: &str) -> Option<serde_json::Result<RawStructuredQuery>> {
    let start = text.find('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<RawStructuredQuery>()
        .next()
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    // Skip the info string, e.g. "json"
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// Absent, null and zero limits fall back to the default
fn parse_limit(value: Option<&Value>) -> Result<Option<usize>> {
    let invalid = |v: &Value| malformed(format!("limit must be a positive integer, got {}", v));

    let limit = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v @ Value::Number(n)) => match n.as_u64() {
            Some(n) => n,
            None => match n.as_f64() {
                Some(x) if x.fract() == 0.0 && x >= 0.0 && x <= u32::MAX as f64 => x as u64,
                _ => return Err(invalid(v)),
            },
        },
        Some(v @ Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid(v))?,
        Some(v) => return Err(invalid(v)),
    };

    match usize::try_from(limit) {
        Ok(0) => Ok(None),
        Ok(limit) => Ok(Some(limit)),
        Err(_) => Err(malformed(format!("limit {} is too large", limit))),
    }
}

enum LiteralValue {
    Single(Literal),
    List(Vec<Literal>),
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| malformed(format!("missing {} in filter", what)))
}

fn literal_value(pair: Pair<'_, Rule>) -> Result<LiteralValue> {
    match pair.as_rule() {
        Rule::list => pair
            .into_inner()
            .map(scalar)
            .collect::<Result<Vec<_>>>()
            .map(LiteralValue::List),
        _ => scalar(pair).map(LiteralValue::Single),
    }
}

fn scalar(pair: Pair<'_, Rule>) -> Result<Literal> {
    match pair.as_rule() {
        Rule::string => Ok(Literal::String(string_content(pair))),
        Rule::number => number_literal(pair.as_str()),
        Rule::boolean => Ok(Literal::Boolean(pair.as_str().eq_ignore_ascii_case("true"))),
        Rule::date_object => date_object(pair),
        rule => Err(malformed(format!("expected a value, found {:?}", rule))),
    }
}

/// `{"date": "YYYY-MM-DD", "type": "date"}`, members in any order
fn date_object(pair: Pair<'_, Rule>) -> Result<Literal> {
    let mut date = None;
    for member in pair.into_inner() {
        let mut parts = member.into_inner();
        let key = text(next_pair(&mut parts, "object key")?);
        let value = string_content(next_pair(&mut parts, "object value")?);

        match key.as_str() {
            "date" => date = Some(value),
            "type" if value == "date" => {}
            "type" => return Err(malformed(format!("unsupported value type '{}'", value))),
            other => return Err(malformed(format!("unexpected key '{}' in value object", other))),
        }
    }

    date.map(Literal::Date)
        .ok_or_else(|| malformed("value object is missing its 'date' member"))
}

/// Text of a string or bare identifier
fn text(pair: Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::string => string_content(pair),
        _ => pair.as_str().to_string(),
    }
}

fn string_content(pair: Pair<'_, Rule>) -> String {
    let raw = pair.into_inner().next().map(|inner| inner.as_str()).unwrap_or_default();
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => {}
            },
            c => value.push(c),
        }
    }
    value
}

fn number_literal(text: &str) -> Result<Literal> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Literal::Integer(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .map(Literal::Float)
        .ok_or_else(|| malformed(format!("invalid number '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use selfquery_schema::{FieldSpec, SemanticType};

    fn schema() -> Schema {
        Schema::from_fields(
            "Brief summary of a movie",
            vec![
                FieldSpec::new("genre", SemanticType::String, "The genre of the movie"),
                FieldSpec::new("year", SemanticType::Integer, "The year the movie was released"),
                FieldSpec::new("director", SemanticType::String, "The name of the movie director"),
                FieldSpec::new("rating", SemanticType::Float, "A 1-10 rating for the movie"),
                FieldSpec::new("released", SemanticType::Date, "Release date"),
                FieldSpec::new("streaming", SemanticType::Boolean, "Available to stream"),
            ],
        )
        .unwrap()
    }

    fn parse(raw: &str) -> Result<StructuredQuery> {
        let schema = schema();
        StructuredQueryParser::new(&schema).parse(raw)
    }

    fn filter(expr: &str) -> Result<FilterNode> {
        let schema = schema();
        StructuredQueryParser::new(&schema).parse_filter(expr)
    }

    #[test]
    fn test_parse_fenced_answer() {
        let raw = "```json\n{\n    \"query\": \"\",\n    \"filter\": \"gt(\\\"rating\\\", 8.0)\"\n}\n```";
        let parsed = parse(raw).unwrap();

        assert_eq!(parsed.query, "");
        assert_eq!(parsed.limit, None);
        assert_eq!(
            parsed.filter,
            Some(FilterNode::comparison("rating", Comparator::Gt, FieldValue::Float(8.0)))
        );
    }

    #[test]
    fn test_parse_answer_with_prose() {
        let raw = r#"Sure! Here is the structured request: {"query": "college life", "filter": "eq(\"director\", \"Rajkumar Hirani\")", "limit": 2} Hope that helps."#;
        let parsed = parse(raw).unwrap();

        assert_eq!(parsed.query, "college life");
        assert_eq!(parsed.limit, Some(2));
        assert_eq!(
            parsed.filter,
            Some(FilterNode::comparison(
                "director",
                Comparator::Eq,
                FieldValue::String("Rajkumar Hirani".into())
            ))
        );
    }

    #[test]
    fn test_no_filter_sentinel() {
        let parsed = parse(r#"{"query": "family drama", "filter": "NO_FILTER"}"#).unwrap();
        assert_eq!(parsed.filter, None);
        assert_eq!(parsed.query, "family drama");

        let parsed = parse(r#"{"query": "family drama", "filter": "no_filter"}"#).unwrap();
        assert_eq!(parsed.filter, None);

        let parsed = parse(r#"{"query": "family drama"}"#).unwrap();
        assert_eq!(parsed.filter, None);
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let err = parse(r#"{"query": "", "filter": "gt(\"budget\", 100)"}"#).unwrap_err();
        assert!(matches!(err, RetrievalError::MalformedQuery(msg) if msg.contains("budget")));
    }

    #[test]
    fn test_illegal_comparator_for_type() {
        assert!(matches!(
            filter(r#"gt("genre", "drama")"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
        assert!(matches!(
            filter(r#"like("rating", "8")"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
        assert!(matches!(
            filter(r#"lt("streaming", true)"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_unknown_operator() {
        let err = filter(r#"contains("genre", "drama")"#).unwrap_err();
        assert!(matches!(err, RetrievalError::MalformedQuery(msg) if msg.contains("contains")));
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(
            filter(r#"gte("rating", "8.5")"#).unwrap(),
            FilterNode::comparison("rating", Comparator::Gte, FieldValue::Float(8.5))
        );
        assert_eq!(
            filter(r#"eq("year", 2009.0)"#).unwrap(),
            FilterNode::comparison("year", Comparator::Eq, FieldValue::Integer(2009))
        );
        assert!(matches!(
            filter(r#"gt("rating", "abc")"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
        assert!(matches!(
            filter(r#"eq("year", true)"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_date_literal() {
        let expected = FilterNode::comparison(
            "released",
            Comparator::Gt,
            FieldValue::Date(NaiveDate::from_ymd_opt(2005, 6, 1).unwrap()),
        );
        assert_eq!(
            filter(r#"gt("released", {"date": "2005-06-01", "type": "date"})"#).unwrap(),
            expected
        );
        assert_eq!(
            filter(r#"gt("released", {"type": "date", "date": "2005-06-01"})"#).unwrap(),
            expected
        );
        assert_eq!(filter(r#"gt("released", "2005-06-01")"#).unwrap(), expected);
        assert!(matches!(
            filter(r#"gt("released", {"date": "June 2005", "type": "date"})"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_nested_logical_operators() {
        let parsed = filter(
            r#"and(or(eq("genre", "comedy"), eq("genre", "drama")), not(lt("year", 1990)), gte("rating", 8))"#,
        )
        .unwrap();

        let expected = FilterNode::and(vec![
            FilterNode::or(vec![
                FilterNode::comparison("genre", Comparator::Eq, FieldValue::String("comedy".into())),
                FilterNode::comparison("genre", Comparator::Eq, FieldValue::String("drama".into())),
            ]),
            FilterNode::not(FilterNode::comparison("year", Comparator::Lt, FieldValue::Integer(1990))),
            FilterNode::comparison("rating", Comparator::Gte, FieldValue::Float(8.0)),
        ]);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_list_values() {
        assert_eq!(
            filter(r#"in("genre", ["comedy", 'drama'])"#).unwrap(),
            FilterNode::comparison(
                "genre",
                Comparator::In,
                vec![
                    FieldValue::String("comedy".into()),
                    FieldValue::String("drama".into()),
                ]
            )
        );
        assert_eq!(
            filter(r#"nin("year", [])"#).unwrap(),
            FilterNode::comparison("year", Comparator::Nin, Vec::<FieldValue>::new())
        );
        // A lone value is read as a one-element list
        assert_eq!(
            filter(r#"in("year", 2009)"#).unwrap(),
            FilterNode::comparison("year", Comparator::In, vec![FieldValue::Integer(2009)])
        );
        assert!(matches!(
            filter(r#"eq("year", [2009, 2010])"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_bare_identifiers_and_case() {
        assert_eq!(
            filter(r#"EQ(streaming, TRUE)"#).unwrap(),
            FilterNode::comparison("streaming", Comparator::Eq, FieldValue::Boolean(true))
        );
    }

    #[test]
    fn test_syntax_errors() {
        for expr in [
            r#"gt("rating", 8.0"#,
            r#"gt("rating" 8.0)"#,
            r#"gt("rating", 8.0))"#,
            r#"and()"#,
            r#"gt("rating", 8.0) eq("year", 2009)"#,
            r#"eq("director", "unterminated)"#,
            r#"eq("year", 20x9)"#,
            r#"eq("year", @)"#,
        ] {
            assert!(
                matches!(filter(expr), Err(RetrievalError::MalformedQuery(_))),
                "expected {} to be rejected",
                expr
            );
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse("I could not figure that out"),
            Err(RetrievalError::MalformedQuery(_))
        ));
        assert!(matches!(
            parse(r#"{"query": "x", "filter": 12}"#),
            Err(RetrievalError::MalformedQuery(_))
        ));
        assert!(matches!(
            parse(r#"{"query": "x", "filter": "NO_FILTER""#),
            Err(RetrievalError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_limit_validation() {
        assert_eq!(parse(r#"{"query": "x", "limit": 3}"#).unwrap().limit, Some(3));
        assert_eq!(parse(r#"{"query": "x", "limit": "5"}"#).unwrap().limit, Some(5));
        assert_eq!(parse(r#"{"query": "x", "limit": 2.0}"#).unwrap().limit, Some(2));
        assert_eq!(parse(r#"{"query": "x", "limit": null}"#).unwrap().limit, None);
        assert_eq!(parse(r#"{"query": "x", "limit": 0}"#).unwrap().limit, None);
        assert_eq!(parse(r#"{"query": "x", "limit": "0"}"#).unwrap().limit, None);

        for limit in ["-1", "2.5", "\"many\"", "true"] {
            let raw = format!(r#"{{"query": "x", "limit": {}}}"#, limit);
            assert!(
                matches!(parse(&raw), Err(RetrievalError::MalformedQuery(_))),
                "expected limit {} to be rejected",
                limit
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut expr = String::from(r#"eq("year", 2009)"#);
        for _ in 0..(MAX_FILTER_DEPTH + 1) {
            expr = format!("not({})", expr);
        }
        assert!(matches!(filter(&expr), Err(RetrievalError::MalformedQuery(_))));
    }

    #[test]
    fn test_display_parses_back() {
        let original = filter(
            r#"or(and(gt("rating", 8.5), like("director", "%hirani%")), in("year", [1975, 2009]), eq("released", {"date": "2009-12-25", "type": "date"}))"#,
        )
        .unwrap();
        assert_eq!(filter(&original.to_string()).unwrap(), original);
    }

    #[test]
    fn test_braces_inside_strings_and_trailing_text() {
        let parsed = parse(r#"{"query": "}{", "filter": "NO_FILTER"} trailing {"#).unwrap();
        assert_eq!(parsed.query, "}{");
        assert_eq!(parsed.filter, None);

        let err = parse("no object here").unwrap_err();
        assert!(matches!(err, RetrievalError::MalformedQuery(msg) if msg.contains("no JSON object")));
    }

    #[test]
    fn test_escaped_quotes_in_values() {
        assert_eq!(
            filter(r#"eq("director", "Raj \"RK\" Kapoor")"#).unwrap(),
            FilterNode::comparison(
                "director",
                Comparator::Eq,
                FieldValue::String(r#"Raj "RK" Kapoor"#.into())
            )
        );
        assert_eq!(
            filter(r#"eq("director", 'O\'Brien')"#).unwrap(),
            FilterNode::comparison("director", Comparator::Eq, FieldValue::String("O'Brien".into()))
        );
    }

    #[test]
    fn test_operator_names_need_word_boundary() {
        // "order" starts like "or" but is read as an (unknown) comparator
        let err = filter(r#"order("genre", "drama")"#).unwrap_err();
        assert!(matches!(err, RetrievalError::MalformedQuery(msg) if msg.contains("order")));
    }
}
