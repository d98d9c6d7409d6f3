//! # SelfQuery LLM
//!
//! Language model and embedding collaborators for self-query retrieval.
//!
//! - [`LanguageModel`] - prompt in, completion text out
//! - [`EmbeddingProvider`] - text in, fixed-dimension vector out
//!
//! Both traits are object safe and `Send + Sync`, so one handle can serve
//! any number of concurrent requests. Implementations:
//!
//! - [`OpenAiChatModel`] / [`OpenAiEmbeddings`] for any OpenAI-compatible
//!   endpoint (configurable base URL)
//! - [`HashEmbedder`] for offline, deterministic embeddings

pub mod config;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod model;

pub use config::{
    OpenAiConfig, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIM,
    DEFAULT_EMBEDDING_MODEL,
};
pub use embedding::{EmbeddingProvider, HashEmbedder, OpenAiEmbeddings, DEFAULT_HASH_DIM};
pub use error::ProviderError;
pub use hashing::hash_text_to_vector;
pub use model::{LanguageModel, OpenAiChatModel};
