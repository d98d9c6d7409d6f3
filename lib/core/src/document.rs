use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Metadata attached to a document, keyed by field name
pub type Metadata = Map<String, Value>;

/// A document: free-text body plus typed metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(default = "DocumentId::random")]
    pub id: DocumentId,
    #[serde(alias = "page_content")]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    String(String),
    Uuid(Uuid),
    Integer(u64),
}

impl DocumentId {
    pub fn random() -> Self {
        DocumentId::Uuid(Uuid::new_v4())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentId::String(s) => write!(f, "{}", s),
            DocumentId::Uuid(u) => write!(f, "{}", u),
            DocumentId::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        DocumentId::String(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId::String(s.to_string())
    }
}

impl From<u64> for DocumentId {
    fn from(i: u64) -> Self {
        DocumentId::Integer(i)
    }
}

impl From<Uuid> for DocumentId {
    fn from(u: Uuid) -> Self {
        DocumentId::Uuid(u)
    }
}

impl Document {
    /// Create a document with a freshly generated id
    #[must_use]
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: DocumentId::random(),
            content: content.into(),
            metadata,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Look up a metadata value
    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.metadata.get(field)
    }
}
