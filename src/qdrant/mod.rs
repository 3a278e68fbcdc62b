//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod types;

pub use client::QdrantService;
pub use filters::{build_repository_filter, payload_to_chunk};
pub use types::{PayloadFields, QdrantError, QdrantHealthSnapshot, ScoredPoint};
