//! # SelfQuery Query
//!
//! The self-query pipeline: a natural-language request is handed to a
//! language model together with the [`Schema`](selfquery_schema::Schema),
//! the model's answer is parsed into a [`StructuredQuery`], the filter is
//! translated into the store's native dialect and a filtered similarity
//! search runs over the residual text.
//!
//! - [`build_prompt`] / [`QueryConstructor`] - prompt construction and the model call
//! - [`StructuredQueryParser`] - extraction, parsing and schema validation
//! - [`FilterTranslator`] - lowering into [`FilterCondition`](selfquery_core::FilterCondition)
//! - [`SelfQueryRetriever`] - the end-to-end executor
//! - [`build_collection`] - embeds and indexes a corpus once at startup
//!
//! Failures surface as one of the four [`RetrievalError`] kinds.

pub mod error;
pub mod ingest;
pub mod parser;
pub mod prompt;
pub mod retriever;
pub mod structured;
pub mod translator;

pub use error::{Result, RetrievalError};
pub use ingest::build_collection;
pub use parser::{StructuredQueryParser, MAX_FILTER_DEPTH};
pub use prompt::{build_prompt, default_examples, FewShotExample, QueryConstructor};
pub use retriever::{
    Interpretation, RetrievalResult, RetrievedDocument, RetrieverConfig, SelfQueryRetriever,
    DEFAULT_LIMIT,
};
pub use structured::{FilterNode, FilterValue, LogicalOperator, StructuredQuery, NO_FILTER};
pub use translator::FilterTranslator;
