//! Document store abstraction used by the retrieval pipeline.
//!
//! The pipeline only talks to a [`DocumentStore`], so a remote vector
//! database can stand in for the in-memory [`Collection`].

use async_trait::async_trait;
use serde::Serialize;

use crate::{Collection, ConditionKind, Distance, Document, FilterCondition, Result, Vector};

/// A stored document together with its distance to the query vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f32,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Distance convention used for returned distances
    fn distance(&self) -> Distance;

    /// Whether the store can evaluate `kind` natively
    fn supports(&self, kind: ConditionKind) -> bool;

    /// Number of stored documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-`k` documents nearest to `query` that satisfy `filter`,
    /// ascending by distance
    async fn search(
        &self,
        query: &Vector,
        filter: Option<&FilterCondition>,
        k: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

#[async_trait]
impl DocumentStore for Collection {
    fn distance(&self) -> Distance {
        Collection::distance(self)
    }

    fn supports(&self, kind: ConditionKind) -> bool {
        Collection::supports(self, kind)
    }

    fn len(&self) -> usize {
        self.count()
    }

    async fn search(
        &self,
        query: &Vector,
        filter: Option<&FilterCondition>,
        k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let results = self.search_with_condition(query, k, filter)?;
        Ok(results
            .into_iter()
            .map(|(document, distance)| ScoredDocument { document, distance })
            .collect())
    }
}
