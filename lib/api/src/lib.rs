//! # SelfQuery API
//!
//! HTTP surface for the self-query retriever.
//!
//! | Method | Path               | Description                                  |
//! |--------|--------------------|----------------------------------------------|
//! | GET    | `/health`          | Liveness and document count                  |
//! | GET    | `/schema`          | Filterable fields and their comparators      |
//! | POST   | `/query`           | Retrieve documents for `{"query": "..."}`    |
//! | POST   | `/query/interpret` | Prompt, raw model output and parsed query    |
//!
//! Queries the model output cannot support answer `422`; model or store
//! outages answer `503`.

pub mod rest;

pub use rest::RestApi;
