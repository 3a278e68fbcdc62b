//! Retrieval-augmented answering over indexed repository chunks.
//!
//! A run moves through six stages in order: optimize the query, retrieve chunks scoped to one
//! repository, rerank them against the original question, summarize the best few, redact
//! sensitive content and generate the answer. Retrieval and generation failures abort the run;
//! the other language-model stages degrade and report what happened.

mod error;
mod generator;
mod optimizer;
mod orchestrator;
mod reranker;
mod retriever;
mod sensitivity;
mod summarizer;
#[cfg(test)]
mod testing;
mod types;

use async_trait::async_trait;

use crate::metrics::MetricsSnapshot;

pub use error::{
    GenerationFailure, OptimizationFailure, PipelineError, RerankingDegraded, RetrievalFailure,
    SummarizationDegraded,
};
pub use generator::{AnswerGenerator, NO_ANSWER, NO_CONTEXT_ANSWER};
pub use optimizer::QueryOptimizer;
pub use orchestrator::{PipelineBuildError, PipelineServices, PipelineSettings, RagPipeline};
pub use reranker::{DocumentReranker, parse_score};
pub use retriever::DocumentRetriever;
pub use sensitivity::{
    PatternSpec, Redacted, SensitivityError, SensitivityFilter, WITHHELD_CONTEXT, default_patterns,
    load_patterns,
};
pub use summarizer::{ContextSummarizer, join_chunks};
pub use types::{
    Chunk, Degradation, OptimizedQuery, PipelineReport, Reranked, ScoredChunk, Stage, Summary,
};

/// Entry contract shared by the HTTP, MCP and CLI surfaces.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Answer `query` about `repository_id`.
    async fn answer(
        &self,
        query: &str,
        repository_id: &str,
    ) -> Result<PipelineReport, PipelineError>;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

#[async_trait]
impl QueryApi for RagPipeline {
    async fn answer(
        &self,
        query: &str,
        repository_id: &str,
    ) -> Result<PipelineReport, PipelineError> {
        self.run_with_report(query, repository_id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics()
    }
}
