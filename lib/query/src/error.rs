use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Failure kinds of the self-query pipeline.
///
/// Each kind surfaces to the caller as-is; nothing is recovered with a
/// fallback guess. Only the two `*Unavailable` kinds are transient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed structured query: {0}")]
    MalformedQuery(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RetrievalError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::ModelUnavailable(_) | RetrievalError::StoreUnavailable(_)
        )
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::ModelUnavailable(_) => "model_unavailable",
            RetrievalError::MalformedQuery(_) => "malformed_query",
            RetrievalError::UnsupportedFilter(_) => "unsupported_filter",
            RetrievalError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Actionable message for end users
    pub fn user_message(&self) -> &'static str {
        match self {
            RetrievalError::MalformedQuery(_) | RetrievalError::UnsupportedFilter(_) => {
                "The query could not be understood. Try rephrasing it."
            }
            RetrievalError::ModelUnavailable(_) | RetrievalError::StoreUnavailable(_) => {
                "The service is temporarily unavailable. Please try again later."
            }
        }
    }
}

impl From<selfquery_core::Error> for RetrievalError {
    fn from(err: selfquery_core::Error) -> Self {
        match err {
            selfquery_core::Error::UnsupportedCondition(kind) => {
                RetrievalError::UnsupportedFilter(format!("store cannot evaluate '{}'", kind))
            }
            other => RetrievalError::StoreUnavailable(other.to_string()),
        }
    }
}
