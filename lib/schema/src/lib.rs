//! # SelfQuery Schema
//!
//! Schema registry for self-query retrieval.
//!
//! ## Overview
//!
//! A [`Schema`] declares the metadata fields a language model may filter on:
//! each [`FieldSpec`] has a name, a [`SemanticType`] and a human description.
//! The schema also carries a one-line description of what document content
//! represents. The query pipeline uses it to:
//!
//! 1. describe the filterable fields in the query-construction prompt
//! 2. check that every comparison names a declared field
//! 3. check that the [`Comparator`] is legal for the field's type
//! 4. coerce [`Literal`] values into typed [`FieldValue`]s
//!
//! ## Schema Definition
//!
//! ```rust
//! use selfquery_schema::{Schema, FieldSpec, SemanticType};
//!
//! let schema = Schema::new("Brief summary of a movie")
//!     .with_field(FieldSpec::new("genre", SemanticType::String, "The genre of the movie"))?
//!     .with_field(FieldSpec::new("year", SemanticType::Integer, "The year the movie was released"))?
//!     .with_field(FieldSpec::new("rating", SemanticType::Float, "A 1-10 rating for the movie"))?;
//!
//! assert_eq!(schema.len(), 3);
//! # Ok::<(), selfquery_schema::SchemaError>(())
//! ```

pub mod schema;
pub mod comparator;
pub mod value;
pub mod corpus;

// Re-export main types
pub use schema::{
    Schema,
    FieldSpec,
    SemanticType,
    SchemaError,
};
pub use comparator::Comparator;
pub use value::{Literal, FieldValue, DATE_FORMAT};
pub use corpus::Corpus;
