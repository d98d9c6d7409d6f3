//! Query construction prompt.
//!
//! The prompt tells a language model which fields exist, which comparators
//! each field accepts, and the exact output format, followed by worked
//! examples. Building the prompt is pure; [`QueryConstructor`] adds the
//! model call.

use selfquery_llm::LanguageModel;
use selfquery_schema::{Comparator, FieldSpec, FieldValue, Schema, SemanticType};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, RetrievalError};
use crate::structured::{FilterNode, LogicalOperator, StructuredQuery, NO_FILTER};

/// A worked example shown to the model
#[derive(Debug, Clone)]
pub struct FewShotExample {
    pub user_query: String,
    pub output: StructuredQuery,
}

impl FewShotExample {
    pub fn new(user_query: impl Into<String>, output: StructuredQuery) -> Self {
        Self {
            user_query: user_query.into(),
            output,
        }
    }
}

const EXAMPLE_CONTENT: &str = "Lyrics of a song";

/// Data source the built-in examples are written against
pub fn example_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("artist", SemanticType::String, "Name of the song artist"),
        FieldSpec::new("length", SemanticType::Integer, "Length of the song in seconds"),
        FieldSpec::new("genre", SemanticType::String, "The song genre"),
        FieldSpec::new("released", SemanticType::Date, "Date the song was released"),
    ]
}

/// Built-in examples covering a conjunction, a disjunction with a limit, a
/// negation and a query without filter
pub fn default_examples() -> Vec<FewShotExample> {
    let text = |s: &str| FieldValue::String(s.to_string());

    vec![
        FewShotExample::new(
            "Upbeat songs by Daft Punk that are shorter than four minutes",
            StructuredQuery::new("upbeat").with_filter(FilterNode::and(vec![
                FilterNode::comparison("artist", Comparator::Eq, text("Daft Punk")),
                FilterNode::comparison("length", Comparator::Lt, FieldValue::Integer(240)),
            ])),
        ),
        FewShotExample::new(
            "Three jazz or blues songs about rain",
            StructuredQuery::new("rain")
                .with_filter(FilterNode::comparison(
                    "genre",
                    Comparator::In,
                    vec![text("jazz"), text("blues")],
                ))
                .with_limit(3),
        ),
        FewShotExample::new(
            "Songs that are not by Adele",
            StructuredQuery::new("").with_filter(FilterNode::not(FilterNode::comparison(
                "artist",
                Comparator::Eq,
                text("Adele"),
            ))),
        ),
        FewShotExample::new(
            "Something calm to listen to while studying",
            StructuredQuery::new("calm music for studying"),
        ),
    ]
}

/// Build the full query construction prompt.
///
/// Deterministic: the same schema, examples and user query always produce
/// the same text.
pub fn build_prompt(schema: &Schema, examples: &[FewShotExample], user_query: &str) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "Your goal is to turn a user's request into a structured query that \
         matches the request schema below.\n\n",
    );
    prompt.push_str("<< Structured Request Schema >>\n");
    prompt.push_str(
        "Respond with a markdown code snippet containing a JSON object in this format:\n\n",
    );
    prompt.push_str("```json\n{\n");
    prompt.push_str("    \"query\": string \\ text to compare against document contents\n");
    prompt.push_str("    \"filter\": string \\ logical condition for filtering documents\n");
    prompt.push_str("    \"limit\": int \\ the number of documents to retrieve\n");
    prompt.push_str("}\n```\n\n");

    prompt.push_str(
        "The query string must only contain text expected to match document contents. \
         Conditions expressed in the filter must not be repeated in the query.\n\n",
    );

    let comparators: Vec<&str> = Comparator::ALL.iter().map(|c| c.as_str()).collect();
    let operators: Vec<&str> = [LogicalOperator::And, LogicalOperator::Or, LogicalOperator::Not]
        .iter()
        .map(|o| o.as_str())
        .collect();

    prompt.push_str(
        "A logical condition is composed of one or more comparison and logical operation statements.\n\n",
    );
    let _ = writeln!(prompt, "A comparison statement has the form `comp(attr, val)`:");
    let _ = writeln!(prompt, "- `comp` ({}): comparator", comparators.join(" | "));
    let _ = writeln!(prompt, "- `attr` (string): name of the attribute to compare");
    let _ = writeln!(
        prompt,
        "- `val`: the comparison value; a list `[v1, v2]` for `in` and `nin`\n"
    );
    let _ = writeln!(
        prompt,
        "A logical operation statement has the form `op(statement1, statement2, ...)`:"
    );
    let _ = writeln!(prompt, "- `op` ({}): logical operator", operators.join(" | "));
    let _ = writeln!(
        prompt,
        "- `statement1`, `statement2`, ...: comparison or logical operation statements\n"
    );

    prompt.push_str("Make sure that you only use the comparators and logical operators listed above.\n");
    prompt.push_str("Make sure that filters only refer to attributes that exist in the data source.\n");
    prompt.push_str("Make sure that each comparator is one the attribute lists as allowed.\n");
    prompt.push_str(
        "Make sure that dates are written as {\"date\": \"YYYY-MM-DD\", \"type\": \"date\"}.\n",
    );
    let _ = writeln!(
        prompt,
        "Make sure that filters are only used as needed. If no filter applies, return \"{}\" as the filter value.",
        NO_FILTER
    );
    prompt.push_str(
        "Make sure that the limit is a positive integer, and leave it out unless the user asks for a number of results.\n\n",
    );

    for (i, example) in examples.iter().enumerate() {
        let _ = writeln!(prompt, "<< Example {}. >>", i + 1);
        prompt.push_str("Data Source:\n");
        render_data_source(&mut prompt, EXAMPLE_CONTENT, &example_fields());
        let _ = writeln!(prompt, "\nUser Query:\n{}\n", example.user_query);
        let _ = writeln!(
            prompt,
            "Structured Request:\n```json\n{}\n```\n",
            example.output.to_model_output()
        );
    }

    let _ = writeln!(prompt, "<< Example {}. >>", examples.len() + 1);
    prompt.push_str("Data Source:\n");
    render_data_source(&mut prompt, schema.content_description(), schema.fields());
    let _ = writeln!(prompt, "\nUser Query:\n{}\n", user_query.trim());
    prompt.push_str("Structured Request:\n");

    prompt
}

fn render_data_source(out: &mut String, content: &str, fields: &[FieldSpec]) {
    let _ = writeln!(out, "Content: {}", content);
    out.push_str("Attributes:\n");
    for field in fields {
        let allowed: Vec<&str> = field
            .semantic_type
            .comparators()
            .iter()
            .map(|c| c.as_str())
            .collect();
        let _ = write!(out, "- {} ({})", field.name, field.semantic_type);
        if !field.description.is_empty() {
            let _ = write!(out, ": {}", field.description);
        }
        let _ = writeln!(out, ". Allowed comparators: {}", allowed.join(", "));
    }
}

/// Asks a language model to structure a user query
pub struct QueryConstructor {
    model: Arc<dyn LanguageModel>,
    examples: Vec<FewShotExample>,
    timeout: Option<Duration>,
}

impl QueryConstructor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            examples: default_examples(),
            timeout: None,
        }
    }

    pub fn with_examples(mut self, examples: Vec<FewShotExample>) -> Self {
        self.examples = examples;
        self
    }

    /// Bound the time spent waiting on the model
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn prompt(&self, schema: &Schema, user_query: &str) -> String {
        build_prompt(schema, &self.examples, user_query)
    }

    /// Build the prompt, send it and return the model's raw answer
    pub async fn construct(&self, schema: &Schema, user_query: &str) -> Result<String> {
        let prompt = self.prompt(schema, user_query);
        debug!(
            "Sending {} byte prompt to model '{}'",
            prompt.len(),
            self.model.name()
        );

        let call = self.model.complete(&prompt);
        let answer = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
                warn!("Model '{}' timed out after {:?}", self.model.name(), timeout);
                RetrievalError::ModelUnavailable(format!("timed out after {:?}", timeout))
            })?,
            None => call.await,
        };

        answer.map_err(|e| {
            warn!("Model '{}' failed: {}", self.model.name(), e);
            RetrievalError::ModelUnavailable(e.to_string())
        })
    }
}
