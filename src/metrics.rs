use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    queries_started: AtomicU64,
    queries_answered: AtomicU64,
    invalid_queries: AtomicU64,
    retrieval_failures: AtomicU64,
    generation_failures: AtomicU64,
    timeouts: AtomicU64,
    degraded_optimizations: AtomicU64,
    degraded_rerank_scores: AtomicU64,
    degraded_summaries: AtomicU64,
    chunks_retrieved: AtomicU64,
    redactions_applied: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a run was admitted.
    pub fn record_started(&self) {
        self.queries_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed run and the work it did.
    pub fn record_answered(&self, chunks_retrieved: usize, redactions: usize) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
        self.chunks_retrieved
            .fetch_add(chunks_retrieved as u64, Ordering::Relaxed);
        self.redactions_applied
            .fetch_add(redactions as u64, Ordering::Relaxed);
    }

    /// Record a query rejected before any stage ran.
    pub fn record_invalid(&self) {
        self.invalid_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aborted retrieval.
    pub fn record_retrieval_failure(&self) {
        self.retrieval_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aborted generation.
    pub fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an expired run deadline.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an optimizer fallback to the original query.
    pub fn record_degraded_optimization(&self) {
        self.degraded_optimizations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record chunks scored `0.0` after failed scoring calls.
    pub fn record_degraded_scores(&self, count: usize) {
        self.degraded_rerank_scores
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a summarizer fallback to the raw context.
    pub fn record_degraded_summary(&self) {
        self.degraded_summaries.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_started: self.queries_started.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
            invalid_queries: self.invalid_queries.load(Ordering::Relaxed),
            retrieval_failures: self.retrieval_failures.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            degraded_optimizations: self.degraded_optimizations.load(Ordering::Relaxed),
            degraded_rerank_scores: self.degraded_rerank_scores.load(Ordering::Relaxed),
            degraded_summaries: self.degraded_summaries.load(Ordering::Relaxed),
            chunks_retrieved: self.chunks_retrieved.load(Ordering::Relaxed),
            redactions_applied: self.redactions_applied.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Runs admitted since startup.
    pub queries_started: u64,
    /// Runs that produced an answer.
    pub queries_answered: u64,
    /// Queries rejected for an empty query or repository.
    pub invalid_queries: u64,
    /// Runs aborted by retrieval failures.
    pub retrieval_failures: u64,
    /// Runs aborted by generation failures.
    pub generation_failures: u64,
    /// Runs aborted by the deadline.
    pub timeouts: u64,
    /// Runs that fell back to the original query.
    pub degraded_optimizations: u64,
    /// Chunks scored `0.0` because their scoring call failed.
    pub degraded_rerank_scores: u64,
    /// Runs that fell back to the raw context.
    pub degraded_summaries: u64,
    /// Chunks returned by the retriever across answered runs.
    pub chunks_retrieved: u64,
    /// Sensitive matches redacted across answered runs.
    pub redactions_applied: u64,
}
