//! Embedding plus repository-scoped nearest-neighbour search.

use std::sync::Arc;

use super::error::RetrievalFailure;
use super::types::Chunk;
use crate::embedding::EmbeddingClient;
use crate::store::VectorStore;

/// Fetches the chunks most similar to a query within one repository.
pub struct DocumentRetriever {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    expected_dimension: Option<usize>,
}

impl DocumentRetriever {
    /// Create a retriever over the given embedding client and vector store.
    pub fn new(embedding: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            store,
            expected_dimension: None,
        }
    }

    /// Reject query vectors whose length differs from the collection's dimension.
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    /// Retrieve at most `limit` chunks belonging to `repository_id`, best match first.
    ///
    /// Zero chunks is a valid result. Chunks a store returns for other repositories are
    /// dropped, so the scope holds even for stores that ignore the filter.
    pub async fn retrieve(
        &self,
        query: &str,
        repository_id: &str,
        limit: usize,
    ) -> Result<Vec<Chunk>, RetrievalFailure> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedding
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(RetrievalFailure::EmptyEmbedding)?;
        if vector.is_empty() {
            return Err(RetrievalFailure::EmptyEmbedding);
        }
        if let Some(expected) = self.expected_dimension
            && vector.len() != expected
        {
            return Err(RetrievalFailure::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let candidates = self
            .store
            .nearest_neighbors(vector, repository_id, limit)
            .await?;
        let returned = candidates.len();
        let chunks: Vec<Chunk> = candidates
            .into_iter()
            .filter(|chunk| chunk.repository_id == repository_id)
            .take(limit)
            .collect();

        let out_of_scope = returned.saturating_sub(chunks.len());
        if out_of_scope > 0 {
            tracing::warn!(
                repository_id,
                dropped = out_of_scope,
                "Dropped chunks outside the requested scope or limit"
            );
        }
        tracing::debug!(repository_id, retrieved = chunks.len(), limit, "Chunks retrieved");
        Ok(chunks)
    }
}
