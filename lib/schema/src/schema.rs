//! Schema registry
//!
//! Declares which metadata fields documents carry, what type each field has
//! and how it should be described to a language model. Schemas are built
//! once at startup and only read afterwards.

use ahash::AHashMap;
use selfquery_core::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::comparator::Comparator;

/// Semantic type of a metadata field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
}

impl SemanticType {
    /// Whether `op` can be applied to values of this type
    pub fn supports(&self, op: Comparator) -> bool {
        match self {
            SemanticType::String => !op.is_ordering(),
            SemanticType::Integer | SemanticType::Float | SemanticType::Date => {
                op != Comparator::Like
            }
            SemanticType::Boolean => matches!(op, Comparator::Eq | Comparator::Ne),
        }
    }

    /// Comparators legal for this type, in declaration order
    pub fn comparators(&self) -> Vec<Comparator> {
        Comparator::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Boolean => "boolean",
            SemanticType::Date => "date",
        };
        f.write_str(name)
    }
}

/// A declared, typed and described metadata field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        semantic_type: SemanticType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            description: description.into(),
        }
    }
}

/// The set of filterable fields plus a description of document content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct Schema {
    content_description: String,
    fields: Vec<FieldSpec>,
    index: AHashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct SchemaDef {
    content_description: String,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        Schema::from_fields(def.content_description, def.fields)
    }
}

impl From<Schema> for SchemaDef {
    fn from(schema: Schema) -> Self {
        SchemaDef {
            content_description: schema.content_description,
            fields: schema.fields,
        }
    }
}

impl Schema {
    /// Create an empty schema
    pub fn new(content_description: impl Into<String>) -> Self {
        Self {
            content_description: content_description.into(),
            fields: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Create a schema from a list of fields, rejecting duplicate names
    pub fn from_fields(
        content_description: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::new(content_description);
        for field in fields {
            schema.register(field)?;
        }
        Ok(schema)
    }

    /// Register a field. Names are unique within a schema.
    pub fn register(&mut self, field: FieldSpec) -> Result<(), SchemaError> {
        if field.name.trim().is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        if self.index.contains_key(&field.name) {
            return Err(SchemaError::DuplicateField(field.name));
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Builder-style [`Schema::register`]
    pub fn with_field(mut self, field: FieldSpec) -> Result<Self, SchemaError> {
        self.register(field)?;
        Ok(self)
    }

    pub fn content_description(&self) -> &str {
        &self.content_description
    }

    /// Fields in registration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Get a field spec by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that a document's metadata only uses declared fields with
    /// values of the declared types
    pub fn validate_document(&self, document: &Document) -> Result<(), SchemaError> {
        for (name, value) in &document.metadata {
            let field = self
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;

            if !field.semantic_type.accepts_json(value) {
                return Err(SchemaError::TypeMismatch {
                    field: name.clone(),
                    expected: field.semantic_type,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Errors raised by schema registration, validation and coercion
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Field name cannot be empty")]
    EmptyFieldName,

    #[error("Field '{0}' is already registered")]
    DuplicateField(String),

    #[error("Field '{0}' not found in schema")]
    UnknownField(String),

    #[error("Field '{field}' expects a {expected} value, got {value}")]
    TypeMismatch {
        field: String,
        expected: SemanticType,
        value: String,
    },

    #[error("Cannot convert {literal} to {expected}")]
    InvalidLiteral {
        expected: SemanticType,
        literal: String,
    },

    #[error("Failed to read corpus: {0}")]
    Io(String),

    #[error("Invalid corpus JSON: {0}")]
    Json(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie_schema() -> Schema {
        Schema::from_fields(
            "Brief summary of a movie",
            vec![
                FieldSpec::new("genre", SemanticType::String, "The genre of the movie"),
                FieldSpec::new("year", SemanticType::Integer, "The year the movie was released"),
                FieldSpec::new("rating", SemanticType::Float, "A 1-10 rating for the movie"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_creation() {
        let schema = movie_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.content_description(), "Brief summary of a movie");
        assert_eq!(schema.field("year").unwrap().semantic_type, SemanticType::Integer);
        assert!(schema.field("budget").is_none());

        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["genre", "year", "rating"]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = movie_schema().with_field(FieldSpec::new("year", SemanticType::Date, ""));
        assert!(matches!(result, Err(SchemaError::DuplicateField(name)) if name == "year"));
    }

    #[test]
    fn test_comparator_legality() {
        assert!(!SemanticType::String.supports(Comparator::Gt));
        assert!(SemanticType::String.supports(Comparator::Like));
        assert!(SemanticType::Float.supports(Comparator::Gt));
        assert!(!SemanticType::Float.supports(Comparator::Like));
        assert!(SemanticType::Date.supports(Comparator::Lte));
        assert_eq!(
            SemanticType::Boolean.comparators(),
            vec![Comparator::Eq, Comparator::Ne]
        );
    }

    #[test]
    fn test_validate_document() {
        let schema = movie_schema();

        let ok = Document::new("x", json!({"year": 2009, "rating": 9}).as_object().unwrap().clone());
        assert!(schema.validate_document(&ok).is_ok());

        let unknown = Document::new("x", json!({"budget": 10}).as_object().unwrap().clone());
        assert!(matches!(
            schema.validate_document(&unknown),
            Err(SchemaError::UnknownField(_))
        ));

        let mistyped = Document::new("x", json!({"year": "2009"}).as_object().unwrap().clone());
        assert!(matches!(
            schema.validate_document(&mistyped),
            Err(SchemaError::TypeMismatch { expected: SemanticType::Integer, .. })
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let schema = movie_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fields(), schema.fields());
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let result: Result<Schema, _> = serde_json::from_value(json!({
            "content_description": "x",
            "fields": [
                {"name": "a", "type": "string"},
                {"name": "a", "type": "integer"}
            ]
        }));
        assert!(result.is_err());
    }
}
