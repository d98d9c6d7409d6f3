//! One-time store initialization: embed documents and index them.

use selfquery_core::{Collection, CollectionConfig, Document, Vector};
use selfquery_llm::EmbeddingProvider;
use tracing::info;

use crate::error::{Result, RetrievalError};

/// Embed every document's content and build an in-memory collection.
///
/// `config.vector_dim` is overridden with the embedder's dimension.
/// Documents keep their order, which is also the tie-break order of
/// later searches.
pub async fn build_collection(
    mut config: CollectionConfig,
    documents: Vec<Document>,
    embedder: &dyn EmbeddingProvider,
) -> Result<Collection> {
    config.vector_dim = embedder.dimension();

    let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
    let embeddings = if contents.is_empty() {
        Vec::new()
    } else {
        embedder
            .embed_batch(&contents)
            .await
            .map_err(|e| RetrievalError::StoreUnavailable(format!("embedding failed: {}", e)))?
    };

    let vectors = embeddings.into_iter().map(Vector::new).collect();
    let collection = Collection::index(config, documents, vectors)?;

    info!(
        "Indexed {} documents into '{}' ({} dimensions)",
        collection.count(),
        collection.name(),
        collection.vector_dim()
    );
    Ok(collection)
}
