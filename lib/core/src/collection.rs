use crate::{ConditionKind, Document, Error, Filter, PayloadFilter, FilterCondition, Result, Vector};
use ahash::AHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a collection
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub name: String,
    pub vector_dim: usize,
    pub distance: Distance,
    /// Filter conditions this collection agrees to evaluate
    pub supported_conditions: Vec<ConditionKind>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            vector_dim: 128,
            distance: Distance::Cosine,
            supported_conditions: ConditionKind::ALL.to_vec(),
        }
    }
}

/// Distance metric. Smaller distances are always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    /// `1 - cosine_similarity`, in `[0, 2]`
    Cosine,
    /// L2 distance, in `[0, inf)`
    Euclidean,
    /// Negated dot product
    Dot,
}

impl Distance {
    pub fn between(&self, a: &Vector, b: &Vector) -> f32 {
        match self {
            Distance::Cosine => 1.0 - a.cosine_similarity(b),
            Distance::Euclidean => a.l2_distance(b),
            Distance::Dot => -a.dot(b),
        }
    }

    /// Map a distance to a similarity score where larger is better
    pub fn to_similarity(&self, distance: f32) -> f32 {
        match self {
            Distance::Cosine => 1.0 - distance,
            Distance::Euclidean => 1.0 / (1.0 + distance),
            Distance::Dot => -distance,
        }
    }
}

struct Entry {
    document: Document,
    vector: Vector,
}

/// An in-memory collection of embedded documents.
///
/// Documents keep their insertion order; searches sort stably so equal
/// distances come back in that order.
pub struct Collection {
    config: CollectionConfig,
    entries: Arc<RwLock<Vec<Entry>>>,
    ids: Arc<RwLock<AHashMap<String, usize>>>,
}

impl Collection {
    pub fn new(config: CollectionConfig) -> Self {
        Self {
            config,
            entries: Arc::new(RwLock::new(Vec::new())),
            ids: Arc::new(RwLock::new(AHashMap::new())),
        }
    }

    /// Build a collection from documents and their parallel embeddings
    pub fn index(
        config: CollectionConfig,
        documents: Vec<Document>,
        embeddings: Vec<Vector>,
    ) -> Result<Self> {
        if documents.len() != embeddings.len() {
            return Err(Error::LengthMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            });
        }

        let collection = Self::new(config);
        for (document, vector) in documents.into_iter().zip(embeddings) {
            collection.insert(document, vector)?;
        }

        debug!(
            "Indexed {} documents into collection '{}'",
            collection.count(),
            collection.name()
        );
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn vector_dim(&self) -> usize {
        self.config.vector_dim
    }

    pub fn distance(&self) -> Distance {
        self.config.distance
    }

    pub fn supports(&self, kind: ConditionKind) -> bool {
        self.config.supported_conditions.contains(&kind)
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Insert a document. Documents are immutable once stored.
    pub fn insert(&self, document: Document, vector: Vector) -> Result<()> {
        if vector.dim() != self.config.vector_dim {
            return Err(Error::InvalidDimension {
                expected: self.config.vector_dim,
                actual: vector.dim(),
            });
        }

        let id_str = document.id.to_string();
        let mut ids = self.ids.write();
        if ids.contains_key(&id_str) {
            return Err(Error::DocumentExists(id_str));
        }

        let mut entries = self.entries.write();
        ids.insert(id_str, entries.len());
        entries.push(Entry { document, vector });
        Ok(())
    }

    /// Get a document by ID
    pub fn get(&self, id: &str) -> Option<Document> {
        let idx = *self.ids.read().get(id)?;
        self.entries.read().get(idx).map(|e| e.document.clone())
    }

    /// Search for the `limit` nearest documents, ascending by distance
    pub fn search(
        &self,
        query: &Vector,
        limit: usize,
        filter: Option<&dyn Filter>,
    ) -> Result<Vec<(Document, f32)>> {
        if limit == 0 {
            return Err(Error::InvalidLimit);
        }

        let entries = self.entries.read();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        if query.dim() != self.config.vector_dim {
            return Err(Error::InvalidDimension {
                expected: self.config.vector_dim,
                actual: query.dim(),
            });
        }

        let distance = self.config.distance;
        let mut results: Vec<(Document, f32)> = entries
            .par_iter()
            .filter(|entry| filter.map(|f| f.matches(&entry.document)).unwrap_or(true))
            .map(|entry| (entry.document.clone(), distance.between(query, &entry.vector)))
            .collect();

        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(limit);
        Ok(results)
    }

    /// Search with a payload condition, rejecting conditions this collection
    /// was not configured to evaluate
    pub fn search_with_condition(
        &self,
        query: &Vector,
        limit: usize,
        condition: Option<&FilterCondition>,
    ) -> Result<Vec<(Document, f32)>> {
        match condition {
            Some(condition) => {
                if let Some(kind) = condition.kinds().into_iter().find(|k| !self.supports(*k)) {
                    return Err(Error::UnsupportedCondition(kind));
                }
                let filter = PayloadFilter::new(condition.clone());
                self.search(query, limit, Some(&filter))
            }
            None => self.search(query, limit, None),
        }
    }

    /// All documents in insertion order
    pub fn iter(&self) -> Vec<Document> {
        self.entries.read().iter().map(|e| e.document.clone()).collect()
    }
}
