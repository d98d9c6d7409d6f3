use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hashing::hash_text_to_vector;
use crate::{OpenAiConfig, ProviderError};

/// Maps text to fixed-dimension vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every returned vector
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Offline embedder based on feature hashing.
///
/// Deterministic for identical input; needs no network or credentials.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

pub const DEFAULT_HASH_DIM: usize = 256;

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(hash_text_to_vector(text, self.dim))
    }
}

/// Embeddings client for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    config: OpenAiConfig,
    client: Client,
    dim: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiConfig, dim: usize) -> Result<Self, ProviderError> {
        if dim == 0 {
            return Err(ProviderError::InvalidConfig(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        let client = config.client()?;
        Ok(Self { config, client, dim })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        // The endpoint rejects empty strings
        let input: Vec<&str> = texts
            .iter()
            .map(|t| if t.trim().is_empty() { " " } else { *t })
            .collect();

        let response = self
            .client
            .post(self.config.url("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Embedding request failed with status {}: {}", status, body);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
            return Err(ProviderError::InvalidResponse(format!(
                "expected dimension {}, got {}",
                self.dim,
                bad.len()
            )));
        }

        debug!("Embedded {} texts with {}", embeddings.len(), self.config.model);
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.request(&refs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_hash_embedder_dimension() {
        let embedder = HashEmbedder::new(32);
        let vector = embedder.embed("college life").await.unwrap();
        assert_eq!(vector.len(), 32);
        assert_eq!(embedder.dimension(), 32);

        let batch = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_openai_embeddings_sorted_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "embed-model",
                "input": ["first", "second"]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .create_async()
            .await;

        let config = OpenAiConfig::new("key", "embed-model").with_api_base(server.url());
        let embedder = OpenAiEmbeddings::new(config, 2).unwrap();
        let embeddings = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_embeddings_dimension_mismatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"index":0,"embedding":[1.0,0.0,0.0]}]}"#)
            .create_async()
            .await;

        let config = OpenAiConfig::new("key", "embed-model").with_api_base(server.url());
        let embedder = OpenAiEmbeddings::new(config, 2).unwrap();
        assert!(matches!(
            embedder.embed("text").await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_openai_embeddings_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(503)
            .create_async()
            .await;

        let config = OpenAiConfig::new("key", "embed-model").with_api_base(server.url());
        let embedder = OpenAiEmbeddings::new(config, 2).unwrap();
        assert!(matches!(
            embedder.embed("text").await,
            Err(ProviderError::Status { status: 503, .. })
        ));
    }
}
