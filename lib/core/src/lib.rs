//! # SelfQuery Core
//!
//! Core library for the SelfQuery retrieval engine.
//!
//! This crate provides the document-side data structures:
//!
//! - [`Vector`] - Dense embedding vector
//! - [`Document`] - Free-text content with typed metadata
//! - [`FilterCondition`] - The store's native metadata predicate dialect
//! - [`Collection`] - In-memory document store with filtered similarity search
//! - [`DocumentStore`] - Store abstraction used by the retrieval pipeline
//!
//! ## Example
//!
//! ```rust
//! use selfquery_core::{Collection, CollectionConfig, Document, FilterCondition, Vector};
//! use serde_json::json;
//!
//! let config = CollectionConfig {
//!     name: "movies".to_string(),
//!     vector_dim: 3,
//!     ..Default::default()
//! };
//!
//! let metadata = json!({"rating": 9.4}).as_object().unwrap().clone();
//! let collection = Collection::index(
//!     config,
//!     vec![Document::new("Three idiots on a quest", metadata)],
//!     vec![Vector::new(vec![1.0, 0.0, 0.0])],
//! ).unwrap();
//!
//! let filter = FilterCondition::GreaterThan { field: "rating".to_string(), value: json!(8.0) };
//! let query = Vector::new(vec![1.0, 0.0, 0.0]);
//! let results = collection.search_with_condition(&query, 4, Some(&filter)).unwrap();
//! assert_eq!(results.len(), 1);
//! ```

pub mod collection;
pub mod vector;
pub mod error;
pub mod document;
pub mod filter;
pub mod store;

pub use collection::{Collection, CollectionConfig, Distance};
pub use vector::Vector;
pub use error::{Error, Result};
pub use document::{Document, DocumentId, Metadata};
pub use filter::{Filter, PayloadFilter, FilterCondition, ConditionKind};
pub use store::{DocumentStore, ScoredDocument};
