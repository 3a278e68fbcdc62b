//! Per-chunk relevance scoring and stable best-first ordering.

use std::sync::{Arc, OnceLock};

use futures_util::{StreamExt, stream};
use regex::Regex;

use super::error::RerankingDegraded;
use super::types::{Chunk, Reranked, ScoredChunk};
use crate::completion::CompletionClient;

pub(crate) const SCORE_INSTRUCTION: &str = "Score how well this document answers the query. \
Respond with a single number between 0 and 1.";

/// Scores retrieved chunks against the original question.
pub struct DocumentReranker {
    completion: Arc<dyn CompletionClient>,
    concurrency: usize,
}

impl DocumentReranker {
    /// Create a reranker issuing at most `concurrency` scoring calls at once.
    pub fn new(completion: Arc<dyn CompletionClient>, concurrency: usize) -> Self {
        Self {
            completion,
            concurrency: concurrency.max(1),
        }
    }

    /// Reorder `chunks` by descending relevance to `query`.
    ///
    /// Every chunk is scored; a failed call scores `0.0` and is reported in
    /// [`Reranked::degraded`]. Equal scores keep their retrieval order.
    pub async fn rerank(&self, query: &str, chunks: Vec<Chunk>) -> Reranked {
        if chunks.is_empty() {
            return Reranked::default();
        }

        let outcomes: Vec<(ScoredChunk, Option<RerankingDegraded>)> =
            stream::iter(chunks.into_iter().enumerate())
                .map(|(position, chunk)| self.score_chunk(query, position, chunk))
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut degraded = Vec::new();
        for (chunk, failure) in outcomes {
            scored.push(chunk);
            degraded.extend(failure);
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            scored = scored.len(),
            degraded = degraded.len(),
            "Chunks reranked"
        );
        let (chunks, scores) = scored
            .into_iter()
            .map(|entry| (entry.chunk, entry.score))
            .unzip();
        Reranked {
            chunks,
            scores,
            degraded,
        }
    }

    async fn score_chunk(
        &self,
        query: &str,
        position: usize,
        chunk: Chunk,
    ) -> (ScoredChunk, Option<RerankingDegraded>) {
        let prompt = format!("Query: {query}\n\nDocument:\n{}", chunk.text);
        match self.completion.complete(SCORE_INSTRUCTION, &prompt).await {
            Ok(reply) => {
                let score = parse_score(&reply);
                (ScoredChunk { chunk, score }, None)
            }
            Err(source) => {
                tracing::warn!(position, error = %source, "Scoring call failed; using 0.0");
                (
                    ScoredChunk { chunk, score: 0.0 },
                    Some(RerankingDegraded { position, source }),
                )
            }
        }
    }
}

/// Parse the leading decimal number of a scoring reply; anything else scores `0.0`.
pub fn parse_score(reply: &str) -> f32 {
    static LEADING_NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = LEADING_NUMBER.get_or_init(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)").ok());
    let Some(pattern) = pattern else {
        return 0.0;
    };

    pattern
        .find(reply.trim())
        .and_then(|found| found.as_str().parse::<f32>().ok())
        .filter(|score| score.is_finite())
        .unwrap_or(0.0)
}
