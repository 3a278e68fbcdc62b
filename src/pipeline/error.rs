//! Failure taxonomy of the RAG pipeline.
//!
//! Retrieval and generation failures are fatal and abort the run. Optimization, per-chunk
//! reranking and summarization failures degrade to a substitute value and are reported
//! alongside the answer instead.

use std::time::Duration;
use thiserror::Error;

use super::types::Stage;
use crate::completion::CompletionError;
use crate::embedding::EmbeddingClientError;
use crate::store::VectorStoreError;

/// The query optimizer could not reach or use its backend.
#[derive(Debug, Error)]
#[error("query optimization failed: {0}")]
pub struct OptimizationFailure(#[from] pub CompletionError);

/// Embedding or vector search failed; the run cannot continue without context.
#[derive(Debug, Error)]
pub enum RetrievalFailure {
    /// Embedding provider failed for the query text.
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vector.
    #[error("embedding provider returned no vector for the query")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match the collection.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the collection.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Vector store request failed.
    #[error("vector search failed: {0}")]
    Store(#[from] VectorStoreError),
}

/// A single chunk's scoring call failed and the chunk was scored `0.0`.
#[derive(Debug, Error)]
#[error("scoring failed for chunk {position}: {source}")]
pub struct RerankingDegraded {
    /// Position of the chunk in the retrieval order.
    pub position: usize,
    /// Backend failure behind the fallback score.
    #[source]
    pub source: CompletionError,
}

/// The summarizer fell back to concatenating the raw chunks.
#[derive(Debug, Error)]
pub enum SummarizationDegraded {
    /// Backend call failed.
    #[error("summarization failed, using raw context: {0}")]
    Backend(#[from] CompletionError),
    /// Backend answered with empty content.
    #[error("summarization returned no content, using raw context")]
    EmptyResponse,
}

/// The answer generator failed; there is no later stage to degrade into.
#[derive(Debug, Error)]
#[error("answer generation failed: {0}")]
pub struct GenerationFailure(#[from] pub CompletionError);

/// Errors surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Query or repository identifier was empty.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Context could not be retrieved.
    #[error("could not retrieve context: {0}")]
    Retrieval(#[from] RetrievalFailure),
    /// Answer could not be generated.
    #[error("could not generate an answer: {0}")]
    Generation(#[from] GenerationFailure),
    /// The per-query deadline expired.
    #[error("pipeline timed out after {timeout:?} during {stage}")]
    Timeout {
        /// Stage in flight when the deadline expired.
        stage: Stage,
        /// Configured deadline.
        timeout: Duration,
    },
    /// The pipeline is no longer accepting work.
    #[error("pipeline is not accepting queries")]
    Unavailable,
}

impl PipelineError {
    /// Stable machine-readable identifier for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::Retrieval(_) => "retrieval_failure",
            Self::Generation(_) => "generation_failure",
            Self::Timeout { .. } => "pipeline_timeout",
            Self::Unavailable => "unavailable",
        }
    }
}
