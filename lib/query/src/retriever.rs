//! Retrieval executor.
//!
//! Runs one natural-language request end to end:
//!
//! ```text
//! user query -> prompt -> model -> parse -> translate -> embed -> search -> rank
//! ```
//!
//! Model, embedder and store are shared handles injected at construction,
//! so one [`SelfQueryRetriever`] serves any number of concurrent requests.

use selfquery_core::{Distance, Document, DocumentStore, Vector};
use selfquery_llm::{EmbeddingProvider, LanguageModel};
use selfquery_schema::Schema;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, RetrievalError};
use crate::parser::StructuredQueryParser;
use crate::prompt::{FewShotExample, QueryConstructor};
use crate::structured::StructuredQuery;
use crate::translator::FilterTranslator;

/// Number of documents returned when the query names no limit
pub const DEFAULT_LIMIT: usize = 4;

/// Executor settings
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub default_limit: usize,
    pub model_timeout: Duration,
    /// Applies separately to the embedding call and the store search
    pub store_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            model_timeout: Duration::from_secs(60),
            store_timeout: Duration::from_secs(30),
        }
    }
}

/// A retrieved document with its similarity score (higher is better)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub document: Document,
    pub score: f32,
}

/// Ordered retrieval output, best match first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// How the request was understood
    pub structured_query: StructuredQuery,
    pub documents: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedDocument> {
        self.documents.iter()
    }
}

/// The prompt sent for a request, the model's raw answer and its parse
#[derive(Debug, Clone, Serialize)]
pub struct Interpretation {
    pub prompt: String,
    pub model_output: String,
    pub structured_query: StructuredQuery,
}

pub struct SelfQueryRetriever {
    schema: Arc<Schema>,
    constructor: QueryConstructor,
    translator: FilterTranslator,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DocumentStore>,
    config: RetrieverConfig,
}

impl SelfQueryRetriever {
    pub fn new(
        schema: Arc<Schema>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::with_config(schema, model, embedder, store, RetrieverConfig::default())
    }

    pub fn with_config(
        schema: Arc<Schema>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn DocumentStore>,
        config: RetrieverConfig,
    ) -> Self {
        let translator = FilterTranslator::for_store(store.as_ref());
        let constructor = QueryConstructor::new(model).with_timeout(config.model_timeout);
        Self {
            schema,
            constructor,
            translator,
            embedder,
            store,
            config,
        }
    }

    /// Replace the worked examples shown to the model
    pub fn with_examples(mut self, examples: Vec<FewShotExample>) -> Self {
        self.constructor = self.constructor.with_examples(examples);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Number of documents in the underlying store
    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    /// Construct and parse a structured query without searching
    pub async fn interpret(&self, user_query: &str) -> Result<Interpretation> {
        let prompt = self.constructor.prompt(&self.schema, user_query);
        let model_output = self.constructor.construct(&self.schema, user_query).await?;
        let structured_query = self.parse(&model_output)?;
        Ok(Interpretation {
            prompt,
            model_output,
            structured_query,
        })
    }

    /// Answer a natural-language request
    pub async fn retrieve(&self, user_query: &str) -> Result<RetrievalResult> {
        let model_output = self.constructor.construct(&self.schema, user_query).await?;
        let structured_query = self.parse(&model_output)?;
        self.search(structured_query).await
    }

    /// Execute an already structured query
    pub async fn search(&self, structured_query: StructuredQuery) -> Result<RetrievalResult> {
        let filter = self.translator.translate(structured_query.filter.as_ref())?;
        let k = structured_query.limit.unwrap_or(self.config.default_limit);
        if k == 0 {
            return Err(RetrievalError::MalformedQuery(
                "limit must be a positive integer".to_string(),
            ));
        }

        let embedding = tokio::time::timeout(
            self.config.store_timeout,
            self.embedder.embed(&structured_query.query),
        )
        .await
        .map_err(|_| {
            warn!("Embedding timed out after {:?}", self.config.store_timeout);
            RetrievalError::StoreUnavailable("embedding timed out".to_string())
        })?
        .map_err(|e| {
            warn!("Embedding failed: {}", e);
            RetrievalError::StoreUnavailable(format!("embedding failed: {}", e))
        })?;
        let vector = Vector::new(embedding);

        let hits = tokio::time::timeout(
            self.config.store_timeout,
            self.store.search(&vector, filter.as_ref(), k),
        )
        .await
        .map_err(|_| {
            warn!("Store search timed out after {:?}", self.config.store_timeout);
            RetrievalError::StoreUnavailable("search timed out".to_string())
        })??;

        let documents = rank(self.store.distance(), hits, k);
        info!(
            "Retrieved {} documents (query={:?}, filter={}, k={})",
            documents.len(),
            structured_query.query,
            structured_query.filter_expression(),
            k
        );

        Ok(RetrievalResult {
            structured_query,
            documents,
        })
    }

    fn parse(&self, model_output: &str) -> Result<StructuredQuery> {
        StructuredQueryParser::new(&self.schema)
            .parse(model_output)
            .map_err(|e| {
                warn!("Rejected model output: {}", e);
                debug!("Model output was: {}", model_output);
                e
            })
    }
}

/// Convert distances to similarities and order best first. The sort is
/// stable, so documents the store returned at equal distance keep their order.
fn rank(
    distance: Distance,
    hits: Vec<selfquery_core::ScoredDocument>,
    k: usize,
) -> Vec<RetrievedDocument> {
    let mut documents: Vec<RetrievedDocument> = hits
        .into_iter()
        .map(|hit| RetrievedDocument {
            score: distance.to_similarity(hit.distance),
            document: hit.document,
        })
        .collect();
    documents.sort_by(|a, b| b.score.total_cmp(&a.score));
    documents.truncate(k);
    documents
}
