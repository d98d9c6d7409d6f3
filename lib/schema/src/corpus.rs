//! Corpus files: a schema plus the seed documents it describes.
//!
//! ```json
//! {
//!   "content_description": "Brief summary of a movie",
//!   "fields": [{"name": "year", "type": "integer", "description": "..."}],
//!   "documents": [{"content": "...", "metadata": {"year": 2009}}]
//! }
//! ```

use selfquery_core::Document;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::schema::{FieldSpec, Schema, SchemaError};

#[derive(Debug, Clone)]
pub struct Corpus {
    pub schema: Schema,
    pub documents: Vec<Document>,
}

#[derive(Deserialize)]
struct CorpusDef {
    content_description: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    documents: Vec<Document>,
}

impl Corpus {
    /// Build a corpus, validating every document against the schema
    pub fn new(schema: Schema, documents: Vec<Document>) -> Result<Self, SchemaError> {
        for document in &documents {
            schema.validate_document(document)?;
        }
        Ok(Self { schema, documents })
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let def: CorpusDef =
            serde_json::from_str(json).map_err(|e| SchemaError::Json(e.to_string()))?;
        let schema = Schema::from_fields(def.content_description, def.fields)?;
        Self::new(schema, def.documents)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::Io(format!("{}: {}", path.display(), e)))?;
        let corpus = Self::from_json_str(&json)?;
        info!(
            "Loaded corpus from {:?}: {} fields, {} documents",
            path,
            corpus.schema.len(),
            corpus.documents.len()
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CORPUS: &str = r#"{
        "content_description": "Brief summary of a movie",
        "fields": [
            {"name": "year", "type": "integer", "description": "Release year"},
            {"name": "director", "type": "string", "description": "Director name"}
        ],
        "documents": [
            {"id": "ddlj", "content": "A man returns to marry his sweetheart", "metadata": {"year": 1995, "director": "Aditya Chopra"}},
            {"content": "Three young men arrive in Mumbai", "metadata": {"year": 1975}}
        ]
    }"#;

    #[test]
    fn test_from_json_str() {
        let corpus = Corpus::from_json_str(CORPUS).unwrap();
        assert_eq!(corpus.schema.len(), 2);
        assert_eq!(corpus.documents.len(), 2);
        assert_eq!(corpus.documents[0].id.to_string(), "ddlj");
    }

    #[test]
    fn test_invalid_document_rejected() {
        let json = CORPUS.replace("\"year\": 1975", "\"year\": \"1975\"");
        assert!(matches!(
            Corpus::from_json_str(&json),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CORPUS.as_bytes()).unwrap();

        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.documents.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Corpus::load(dir.path().join("missing.json")),
            Err(SchemaError::Io(_))
        ));
    }
}
