//! # SelfQuery
//!
//! Natural-language retrieval over documents with typed metadata.
//!
//! A request such as *"movies by Rajkumar Hirani about college life"* is
//! split by a language model into a metadata filter
//! (`eq("director", "Rajkumar Hirani")`) and residual semantic text
//! (`"about college life"`). The filter is validated against a declared
//! schema, translated into the document store's native condition dialect
//! and combined with a similarity search over the residual text.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! export SELFQUERY_API_KEY=...
//! selfquery --corpus data/movies.json --http-port 8080
//! curl -X POST localhost:8080/query -d '{"query": "movies rated higher than 8"}' \
//!      -H 'content-type: application/json'
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use selfquery::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let corpus = Corpus::load("data/movies.json")?;
//! let embedder = Arc::new(HashEmbedder::default());
//! let store = build_collection(CollectionConfig::default(), corpus.documents, embedder.as_ref()).await?;
//!
//! let model = Arc::new(OpenAiChatModel::new(OpenAiConfig::new("sk-...", "gpt-4o-mini"))?);
//! let retriever = SelfQueryRetriever::new(Arc::new(corpus.schema), model, embedder, Arc::new(store));
//!
//! for hit in retriever.retrieve("movies rated higher than 8").await?.iter() {
//!     println!("{:.3} {}", hit.score, hit.document.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `selfquery-core` - Documents, vectors, filter conditions and the in-memory store
//! - `selfquery-schema` - Field declarations, comparators, literal coercion, corpus files
//! - `selfquery-llm` - Language model and embedding providers
//! - `selfquery-query` - Prompt construction, parsing, filter translation, retrieval
//! - `selfquery-api` - REST API

// Re-export core types
pub use selfquery_core::{
    Collection, CollectionConfig, Distance,
    Document, DocumentId, Metadata, Vector,
    DocumentStore, ScoredDocument,
    FilterCondition, ConditionKind,
};

// Re-export schema types
pub use selfquery_schema::{
    Schema, FieldSpec, SemanticType, SchemaError,
    Comparator, Literal, FieldValue, Corpus,
};

// Re-export providers
pub use selfquery_llm::{
    LanguageModel, EmbeddingProvider, ProviderError,
    OpenAiConfig, OpenAiChatModel, OpenAiEmbeddings, HashEmbedder,
};

// Re-export the pipeline
pub use selfquery_query::{
    build_collection, build_prompt,
    FilterNode, FilterValue, LogicalOperator, StructuredQuery,
    StructuredQueryParser, FilterTranslator, QueryConstructor,
    SelfQueryRetriever, RetrieverConfig, RetrievalResult, RetrievedDocument, Interpretation,
    RetrievalError,
};

// Re-export API
pub use selfquery_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Collection, CollectionConfig, Distance,
        Document, DocumentStore, Vector,
        Schema, FieldSpec, SemanticType, Comparator, Corpus,
        LanguageModel, EmbeddingProvider,
        OpenAiConfig, OpenAiChatModel, OpenAiEmbeddings, HashEmbedder,
        build_collection, StructuredQuery, FilterNode,
        SelfQueryRetriever, RetrieverConfig, RetrievalResult, RetrievalError,
        RestApi,
    };
}
