use thiserror::Error;

use crate::filter::ConditionKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Document already exists: {0}")]
    DocumentExists(String),

    #[error("Document/embedding count mismatch: {documents} documents, {embeddings} embeddings")]
    LengthMismatch { documents: usize, embeddings: usize },

    #[error("Search limit must be greater than zero")]
    InvalidLimit,

    #[error("Filter condition not supported by this store: {0}")]
    UnsupportedCondition(ConditionKind),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
