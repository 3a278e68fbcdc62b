//! End-to-end pipeline runs against in-process backends.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reporag::completion::{CompletionClient, CompletionError};
use reporag::embedding::{EmbeddingClient, EmbeddingClientError};
use reporag::pipeline::{
    Chunk, NO_CONTEXT_ANSWER, PipelineError, PipelineServices, PipelineSettings, RagPipeline,
    SensitivityFilter, Stage,
};
use reporag::store::{VectorStore, VectorStoreError};

#[derive(Default)]
struct Backend {
    fail_generation: bool,
    failing_chunks: HashSet<String>,
    score_delay: Option<Duration>,
    generation_delay: Option<Duration>,
    active_runs: AtomicUsize,
    max_active_runs: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

impl Backend {
    fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(system, _)| system.starts_with(prefix))
            .map(|(_, user)| user.clone())
            .collect()
    }
}

fn document_of(prompt: &str) -> &str {
    prompt.rsplit("Document:\n").next().unwrap_or_default()
}

#[async_trait]
impl CompletionClient for Backend {
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((system_instruction.to_string(), user_content.to_string()));

        if system_instruction.starts_with("Rephrase") {
            let active = self.active_runs.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active_runs.fetch_max(active, Ordering::SeqCst);
            return Ok(format!("{user_content} implementation"));
        }
        if system_instruction.starts_with("Score") {
            if let Some(delay) = self.score_delay {
                tokio::time::sleep(delay).await;
            }
            let document = document_of(user_content);
            if self.failing_chunks.contains(document) {
                return Err(CompletionError::GenerationFailed("scoring crashed".into()));
            }
            let index: u32 = document
                .trim_start_matches("chunk ")
                .parse()
                .unwrap_or_default();
            return Ok(format!("0.{index} relevant"));
        }
        if system_instruction.starts_with("Summarize") {
            return Ok(format!("SUMMARY[{user_content}]"));
        }
        if system_instruction.starts_with("Only answer") {
            if let Some(delay) = self.generation_delay {
                tokio::time::sleep(delay).await;
            }
            self.active_runs.fetch_sub(1, Ordering::SeqCst);
            if self.fail_generation {
                return Err(CompletionError::ProviderUnavailable(
                    "connection refused".into(),
                ));
            }
            return Ok("The answer comes from the summarized context.".into());
        }
        Ok(String::new())
    }
}

struct Embedder;

#[async_trait]
impl EmbeddingClient for Embedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts.iter().map(|_| vec![0.25; 4]).collect())
    }
}

struct Store(Vec<Chunk>);

#[async_trait]
impl VectorStore for Store {
    async fn nearest_neighbors(
        &self,
        _vector: Vec<f32>,
        repository_id: &str,
        limit: usize,
    ) -> Result<Vec<Chunk>, VectorStoreError> {
        Ok(self
            .0
            .iter()
            .filter(|chunk| chunk.repository_id == repository_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

fn chunks(count: usize) -> Vec<Chunk> {
    (0..count)
        .map(|index| Chunk::new(format!("chunk {index}"), "acme/api"))
        .collect()
}

fn build(backend: Arc<Backend>, chunks: Vec<Chunk>, settings: PipelineSettings) -> RagPipeline {
    RagPipeline::new(
        PipelineServices {
            embedding: Arc::new(Embedder),
            completion: backend,
            store: Arc::new(Store(chunks)),
        },
        SensitivityFilter::with_defaults().expect("default patterns"),
        settings,
    )
}

#[tokio::test]
async fn answers_from_summarized_top_three() {
    let backend = Arc::new(Backend::default());
    let pipeline = build(backend.clone(), chunks(8), PipelineSettings::default());

    let report = pipeline
        .run_with_report("How are requests authenticated?", "acme/api")
        .await
        .expect("run succeeds");

    assert!(!report.answer.is_empty());
    assert_eq!(report.retrieved_chunks, 8);
    assert_eq!(report.summarized_chunks, 3);
    assert!(report.degradations.is_empty());

    let summarized = backend.calls_starting_with("Summarize");
    assert_eq!(summarized, vec!["chunk 7\n\nchunk 6\n\nchunk 5"]);
    let generation = backend.calls_starting_with("Only answer");
    assert_eq!(
        generation,
        vec![
            "Context:\nSUMMARY[chunk 7\n\nchunk 6\n\nchunk 5]\n\nQuery: How are requests authenticated?"
        ]
    );
}

#[tokio::test]
async fn empty_repository_yields_no_context_answer() {
    let backend = Arc::new(Backend::default());
    let pipeline = build(backend.clone(), chunks(8), PipelineSettings::default());

    let report = pipeline
        .run_with_report("How are requests authenticated?", "acme/empty")
        .await
        .expect("run succeeds");

    assert_eq!(report.answer, NO_CONTEXT_ANSWER);
    assert_eq!(report.retrieved_chunks, 0);
    assert_eq!(report.summarized_chunks, 0);
    assert!(backend.calls_starting_with("Score").is_empty());
    assert!(backend.calls_starting_with("Only answer").is_empty());
}

#[tokio::test]
async fn generation_failure_aborts_without_partial_answer() {
    let backend = Arc::new(Backend {
        fail_generation: true,
        ..Backend::default()
    });
    let pipeline = build(backend, chunks(8), PipelineSettings::default());

    let error = pipeline
        .run("How are requests authenticated?", "acme/api")
        .await
        .expect_err("generation fails");

    assert!(matches!(error, PipelineError::Generation(_)));
    assert!(error.to_string().starts_with("could not generate an answer"));
    let metrics = pipeline.metrics();
    assert_eq!(metrics.generation_failures, 1);
    assert_eq!(metrics.queries_answered, 0);
}

#[tokio::test]
async fn failed_scoring_calls_degrade_but_complete() {
    let backend = Arc::new(Backend {
        failing_chunks: ["chunk 6", "chunk 7"].into_iter().map(String::from).collect(),
        ..Backend::default()
    });
    let pipeline = build(backend.clone(), chunks(8), PipelineSettings::default());

    let report = pipeline
        .run_with_report("How are requests authenticated?", "acme/api")
        .await
        .expect("run succeeds");

    assert_eq!(report.degradations.len(), 2);
    assert!(report.degradations.iter().all(|d| d.stage() == Stage::Rerank));
    assert_eq!(
        backend.calls_starting_with("Summarize"),
        vec!["chunk 5\n\nchunk 4\n\nchunk 3"]
    );
    assert_eq!(pipeline.metrics().degraded_rerank_scores, 2);
}

#[tokio::test]
async fn deadline_names_the_stage_in_flight() {
    let backend = Arc::new(Backend {
        score_delay: Some(Duration::from_secs(5)),
        ..Backend::default()
    });
    let settings = PipelineSettings {
        timeout: Some(Duration::from_millis(100)),
        ..PipelineSettings::default()
    };
    let pipeline = build(backend.clone(), chunks(8), settings);

    let error = pipeline
        .run("How are requests authenticated?", "acme/api")
        .await
        .expect_err("deadline expires");

    assert!(matches!(
        error,
        PipelineError::Timeout {
            stage: Stage::Rerank,
            ..
        }
    ));
    assert!(backend.calls_starting_with("Summarize").is_empty());
    assert_eq!(pipeline.metrics().timeouts, 1);
}

#[tokio::test]
async fn in_flight_cap_serializes_runs() {
    let backend = Arc::new(Backend {
        generation_delay: Some(Duration::from_millis(50)),
        ..Backend::default()
    });
    let settings = PipelineSettings {
        max_concurrent_queries: Some(1),
        ..PipelineSettings::default()
    };
    let pipeline = build(backend.clone(), chunks(4), settings);

    let (first, second, third) = tokio::join!(
        pipeline.run("first", "acme/api"),
        pipeline.run("second", "acme/api"),
        pipeline.run("third", "acme/api"),
    );

    assert!(first.is_ok() && second.is_ok() && third.is_ok());
    assert_eq!(backend.max_active_runs.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.metrics().queries_answered, 3);
}
