//! In-memory service doubles for pipeline unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::Chunk;
use crate::completion::{CompletionClient, CompletionError};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::store::{VectorStore, VectorStoreError};

type Responder = Box<dyn Fn(&str) -> Result<String, CompletionError> + Send + Sync>;

/// Completion client answering per system instruction.
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    responders: HashMap<&'static str, Responder>,
    delays: HashMap<&'static str, Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, instruction: &'static str, reply: &str) -> Self {
        let reply = reply.to_string();
        self.respond_with(instruction, move |_| Ok(reply.clone()))
    }

    pub(crate) fn failing(self, instruction: &'static str) -> Self {
        self.respond_with(instruction, |_| {
            Err(CompletionError::ProviderUnavailable("connection refused".into()))
        })
    }

    pub(crate) fn respond_with<F>(mut self, instruction: &'static str, responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        self.responders.insert(instruction, Box::new(responder));
        self
    }

    pub(crate) fn delayed(mut self, instruction: &'static str, delay: Duration) -> Self {
        self.delays.insert(instruction, delay);
        self
    }

    pub(crate) fn calls_for(&self, instruction: &str) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(system, _)| system == instruction)
            .map(|(_, user)| user.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((system_instruction.to_string(), user_content.to_string()));
        if let Some(delay) = self.delays.get(system_instruction) {
            tokio::time::sleep(*delay).await;
        }
        match self.responders.get(system_instruction) {
            Some(responder) => responder(user_content),
            None => Ok(String::new()),
        }
    }
}

/// Embedding client returning a fixed vector per input.
pub(crate) struct FixedEmbedding {
    pub(crate) dimension: usize,
    pub(crate) fail: bool,
}

#[async_trait]
impl EmbeddingClient for FixedEmbedding {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.fail {
            return Err(EmbeddingClientError::ProviderUnavailable("offline".into()));
        }
        Ok(texts.iter().map(|_| vec![0.5; self.dimension]).collect())
    }
}

/// Store that ignores the repository filter, so scope enforcement is observable.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) fail: bool,
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn nearest_neighbors(
        &self,
        _vector: Vec<f32>,
        _repository_id: &str,
        limit: usize,
    ) -> Result<Vec<Chunk>, VectorStoreError> {
        if self.fail {
            return Err(VectorStoreError::Unavailable("store offline".into()));
        }
        Ok(self.chunks.iter().take(limit * 2).cloned().collect())
    }
}

/// Eight chunks for `repository_id`, named `chunk-0` through `chunk-7`.
pub(crate) fn sample_chunks(repository_id: &str) -> Vec<Chunk> {
    (0..8)
        .map(|index| {
            Chunk::new(format!("chunk-{index}"), repository_id)
                .with_file_name(format!("src/auth/{index}.rs"))
        })
        .collect()
}
