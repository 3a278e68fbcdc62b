//! Sequential composition of the pipeline stages under one deadline.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::error::PipelineError;
use super::generator::AnswerGenerator;
use super::optimizer::QueryOptimizer;
use super::reranker::DocumentReranker;
use super::retriever::DocumentRetriever;
use super::sensitivity::{SensitivityError, SensitivityFilter};
use super::summarizer::ContextSummarizer;
use super::types::{Chunk, Degradation, PipelineReport, Stage};
use crate::completion::{CompletionClient, build_completion_client};
use crate::config::{
    Config, DEFAULT_PIPELINE_TIMEOUT_SECS, DEFAULT_RERANK_CONCURRENCY, DEFAULT_RETRIEVAL_LIMIT,
    DEFAULT_SUMMARY_TOP_N,
};
use crate::embedding::{EmbeddingClient, build_embedding_client};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::qdrant::{QdrantError, QdrantService};
use crate::store::VectorStore;

/// Tunables of a pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Chunks fetched per query (K).
    pub retrieval_limit: usize,
    /// Reranked chunks handed to the summarizer (N).
    pub summary_top_n: usize,
    /// Concurrent scoring calls per run.
    pub rerank_concurrency: usize,
    /// Deadline for a whole run, admission included. `None` disables it.
    pub timeout: Option<Duration>,
    /// Cap on runs in flight at once. `None` admits every run.
    pub max_concurrent_queries: Option<usize>,
    /// Expected embedding dimension, checked before searching.
    pub embedding_dimension: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
            summary_top_n: DEFAULT_SUMMARY_TOP_N,
            rerank_concurrency: DEFAULT_RERANK_CONCURRENCY,
            timeout: Some(Duration::from_secs(DEFAULT_PIPELINE_TIMEOUT_SECS)),
            max_concurrent_queries: None,
            embedding_dimension: None,
        }
    }
}

impl PipelineSettings {
    /// Settings derived from the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            retrieval_limit: config.retrieval_limit,
            summary_top_n: config.summary_top_n,
            rerank_concurrency: config.rerank_concurrency,
            timeout: config.pipeline_timeout,
            max_concurrent_queries: config.max_concurrent_queries,
            embedding_dimension: Some(config.embedding_dimension),
        }
    }
}

/// External services a pipeline talks to.
#[derive(Clone)]
pub struct PipelineServices {
    /// Embeds the optimized query.
    pub embedding: Arc<dyn EmbeddingClient>,
    /// Backs the optimizer, reranker, summarizer and generator.
    pub completion: Arc<dyn CompletionClient>,
    /// Repository-scoped nearest-neighbour search.
    pub store: Arc<dyn VectorStore>,
}

impl PipelineServices {
    /// HTTP-backed services for the configured providers and Qdrant collection.
    pub fn from_config(config: &Config, http: Client) -> Result<Self, PipelineBuildError> {
        let store = QdrantService::new(config, http.clone())?;
        Ok(Self {
            embedding: build_embedding_client(config, http.clone()),
            completion: build_completion_client(config, http),
            store: Arc::new(store),
        })
    }
}

/// Failures while assembling a pipeline from configuration.
#[derive(Debug, Error)]
pub enum PipelineBuildError {
    /// Shared HTTP client could not be created.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant settings were rejected.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Sensitive patterns could not be loaded.
    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
}

/// The full retrieval-augmented answering pipeline.
pub struct RagPipeline {
    optimizer: QueryOptimizer,
    retriever: DocumentRetriever,
    reranker: DocumentReranker,
    summarizer: ContextSummarizer,
    filter: SensitivityFilter,
    generator: AnswerGenerator,
    settings: PipelineSettings,
    admission: Semaphore,
    metrics: PipelineMetrics,
}

impl RagPipeline {
    /// Assemble a pipeline from explicit service handles.
    pub fn new(
        services: PipelineServices,
        filter: SensitivityFilter,
        settings: PipelineSettings,
    ) -> Self {
        let mut retriever = DocumentRetriever::new(services.embedding, services.store);
        if let Some(dimension) = settings.embedding_dimension {
            retriever = retriever.with_expected_dimension(dimension);
        }
        let permits = settings
            .max_concurrent_queries
            .map_or(Semaphore::MAX_PERMITS, |cap| cap.clamp(1, Semaphore::MAX_PERMITS));

        Self {
            optimizer: QueryOptimizer::new(services.completion.clone()),
            retriever,
            reranker: DocumentReranker::new(
                services.completion.clone(),
                settings.rerank_concurrency,
            ),
            summarizer: ContextSummarizer::new(services.completion.clone()),
            filter,
            generator: AnswerGenerator::new(services.completion),
            settings,
            admission: Semaphore::new(permits),
            metrics: PipelineMetrics::new(),
        }
    }

    /// Assemble the HTTP-backed pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, PipelineBuildError> {
        let http = Client::builder()
            .user_agent(concat!("reporag/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let services = PipelineServices::from_config(config, http)?;
        let filter = match &config.sensitive_patterns_file {
            Some(path) => SensitivityFilter::with_patterns_file(Path::new(path))?,
            None => SensitivityFilter::with_defaults()?,
        };
        Ok(Self::new(
            services,
            filter,
            PipelineSettings::from_config(config),
        ))
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop admitting runs; later calls fail with [`PipelineError::Unavailable`].
    pub fn close(&self) {
        self.admission.close();
    }

    /// Answer `query` about the repository `repository_id`.
    pub async fn run(&self, query: &str, repository_id: &str) -> Result<String, PipelineError> {
        self.run_with_report(query, repository_id)
            .await
            .map(|report| report.answer)
    }

    /// Answer `query` and report how the run went.
    pub async fn run_with_report(
        &self,
        query: &str,
        repository_id: &str,
    ) -> Result<PipelineReport, PipelineError> {
        let repository_id = repository_id.trim();
        if query.trim().is_empty() {
            self.metrics.record_invalid();
            return Err(PipelineError::InvalidQuery("query must not be empty".into()));
        }
        if repository_id.is_empty() {
            self.metrics.record_invalid();
            return Err(PipelineError::InvalidQuery(
                "repository_id must not be empty".into(),
            ));
        }

        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("rag_pipeline", run_id = %run_id, repository_id);
        let result = self
            .execute(run_id, query, repository_id)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match &result {
            Ok(report) => {
                tracing::info!(
                    retrieved = report.retrieved_chunks,
                    degradations = report.degradations.len(),
                    "Query answered"
                );
            }
            Err(error) => {
                match error {
                    PipelineError::Retrieval(_) => self.metrics.record_retrieval_failure(),
                    PipelineError::Generation(_) => self.metrics.record_generation_failure(),
                    PipelineError::Timeout { .. } => self.metrics.record_timeout(),
                    PipelineError::InvalidQuery(_) | PipelineError::Unavailable => {}
                }
                tracing::error!(kind = error.kind(), error = %error, "Query failed");
            }
        }
        result
    }

    async fn execute(
        &self,
        run_id: String,
        query: &str,
        repository_id: &str,
    ) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let _permit = self
            .within(started, Stage::Admission, self.admission.acquire())
            .await?
            .map_err(|_| PipelineError::Unavailable)?;
        self.metrics.record_started();

        let mut degradations = Vec::new();

        let optimized_query = match self
            .within(started, Stage::Optimize, self.optimizer.optimize(query))
            .await?
        {
            Ok(optimized) => optimized.text,
            Err(failure) => {
                tracing::warn!(error = %failure, "Optimizer failed; retrieving with original query");
                self.metrics.record_degraded_optimization();
                degradations.push(Degradation::Optimization(failure));
                query.to_string()
            }
        };

        let chunks = self
            .within(
                started,
                Stage::Retrieve,
                self.retriever
                    .retrieve(&optimized_query, repository_id, self.settings.retrieval_limit),
            )
            .await??;
        let retrieved_chunks = chunks.len();

        let reranked = self
            .within(started, Stage::Rerank, self.reranker.rerank(query, chunks))
            .await?;
        if !reranked.degraded.is_empty() {
            self.metrics.record_degraded_scores(reranked.degraded.len());
        }
        degradations.extend(reranked.degraded.into_iter().map(Degradation::Reranking));

        let top: Vec<Chunk> = reranked
            .chunks
            .into_iter()
            .take(self.settings.summary_top_n)
            .collect();
        let summary = self
            .within(started, Stage::Summarize, self.summarizer.summarize(&top))
            .await?;
        if let Some(degraded) = summary.degraded {
            self.metrics.record_degraded_summary();
            degradations.push(Degradation::Summarization(degraded));
        }

        let filtered = self.filter.redact(&summary.text);

        let answer = self
            .within(
                started,
                Stage::Generate,
                self.generator.generate(query, &filtered.text),
            )
            .await??;
        self.metrics
            .record_answered(retrieved_chunks, filtered.redactions);

        Ok(PipelineReport {
            run_id,
            answer,
            optimized_query,
            retrieved_chunks,
            summarized_chunks: top.len(),
            redactions: filtered.redactions,
            degradations,
        })
    }

    async fn within<F: Future>(
        &self,
        started: Instant,
        stage: Stage,
        future: F,
    ) -> Result<F::Output, PipelineError> {
        tracing::debug!(%stage, "Stage started");
        let Some((timeout, deadline)) = self
            .settings
            .timeout
            .and_then(|timeout| Some((timeout, started.checked_add(timeout)?)))
        else {
            return Ok(future.await);
        };
        tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|_| PipelineError::Timeout { stage, timeout })
    }
}
