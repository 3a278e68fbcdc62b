//! Vector store boundary consumed by the retriever.

use crate::pipeline::Chunk;
use crate::qdrant::QdrantError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by vector store implementations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Qdrant rejected or failed the request.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Store could not serve the request for another reason.
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
}

/// Similarity search scoped to one repository.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return at most `limit` chunks nearest to `vector`, restricted by an equality filter on
    /// the repository identifier and ordered by descending similarity.
    async fn nearest_neighbors(
        &self,
        vector: Vec<f32>,
        repository_id: &str,
        limit: usize,
    ) -> Result<Vec<Chunk>, VectorStoreError>;
}
