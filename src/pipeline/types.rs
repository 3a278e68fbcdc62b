//! Values threaded between pipeline stages.

use serde::Serialize;
use std::fmt;

use super::error::{OptimizationFailure, RerankingDegraded, SummarizationDegraded};

/// A unit of repository text returned by the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Chunk contents.
    pub text: String,
    /// Repository namespace the chunk was indexed under.
    pub repository_id: String,
    /// Source file the chunk was cut from, when the store records it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Chunk {
    /// Build a chunk without file provenance.
    pub fn new(text: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            repository_id: repository_id.into(),
            file_name: None,
        }
    }

    /// Attach the source file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Chunk paired with the relevance score assigned while reranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The scored chunk.
    pub chunk: Chunk,
    /// Relevance estimate parsed from the scoring backend, `0.0` when unavailable.
    pub score: f32,
}

/// Output of the query optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedQuery {
    /// Query text to embed for retrieval.
    pub text: String,
    /// `false` when the backend returned nothing and the original query was kept.
    pub rewritten: bool,
}

/// Output of the reranker.
#[derive(Debug, Default)]
pub struct Reranked {
    /// Input chunks ordered best-first.
    pub chunks: Vec<Chunk>,
    /// Scores aligned with `chunks`.
    pub scores: Vec<f32>,
    /// Chunks whose scoring call failed and were scored `0.0`.
    pub degraded: Vec<RerankingDegraded>,
}

/// Output of the context summarizer.
#[derive(Debug, Default)]
pub struct Summary {
    /// Context handed to the sensitivity filter.
    pub text: String,
    /// Set when the raw concatenation was used instead of a backend summary.
    pub degraded: Option<SummarizationDegraded>,
}

/// Pipeline stage names used in timeouts and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for an in-flight slot.
    Admission,
    /// Query rewriting.
    Optimize,
    /// Embedding and nearest-neighbour search.
    Retrieve,
    /// Per-chunk relevance scoring.
    Rerank,
    /// Context compression.
    Summarize,
    /// Answer synthesis.
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admission => "admission",
            Self::Optimize => "optimize",
            Self::Retrieve => "retrieve",
            Self::Rerank => "rerank",
            Self::Summarize => "summarize",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Non-fatal stage failure recorded during a run.
#[derive(Debug)]
pub enum Degradation {
    /// Optimizer failed; the original query was used for retrieval.
    Optimization(OptimizationFailure),
    /// A chunk's scoring call failed; it was scored `0.0`.
    Reranking(RerankingDegraded),
    /// Summarizer fell back to the raw concatenation.
    Summarization(SummarizationDegraded),
}

impl Degradation {
    /// Stage that degraded.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Optimization(_) => Stage::Optimize,
            Self::Reranking(_) => Stage::Rerank,
            Self::Summarization(_) => Stage::Summarize,
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimization(inner) => write!(f, "{inner}"),
            Self::Reranking(inner) => write!(f, "{inner}"),
            Self::Summarization(inner) => write!(f, "{inner}"),
        }
    }
}

/// Everything a run produced, for callers that want more than the answer.
#[derive(Debug)]
pub struct PipelineReport {
    /// Identifier attached to the run's tracing span.
    pub run_id: String,
    /// Final answer text.
    pub answer: String,
    /// Query used for retrieval (original when optimization degraded).
    pub optimized_query: String,
    /// Number of chunks the retriever returned.
    pub retrieved_chunks: usize,
    /// Number of chunks handed to the summarizer.
    pub summarized_chunks: usize,
    /// Number of sensitive matches redacted from the context.
    pub redactions: usize,
    /// Non-fatal failures that occurred along the way.
    pub degradations: Vec<Degradation>,
}
