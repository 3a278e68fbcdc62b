//! Context compression for the top reranked chunks.

use std::sync::Arc;

use super::error::SummarizationDegraded;
use super::types::{Chunk, Summary};
use crate::completion::CompletionClient;

pub(crate) const SUMMARIZE_INSTRUCTION: &str =
    "Summarize the following content for a concise answer.";

const SEPARATOR: &str = "\n\n";

/// Condenses chunks into a single context block.
pub struct ContextSummarizer {
    completion: Arc<dyn CompletionClient>,
}

impl ContextSummarizer {
    /// Create a summarizer backed by the given completion client.
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Summarize `chunks`, falling back to their concatenation when the backend fails.
    ///
    /// An empty slice yields an empty summary without a backend call.
    pub async fn summarize(&self, chunks: &[Chunk]) -> Summary {
        if chunks.is_empty() {
            return Summary {
                text: String::new(),
                degraded: None,
            };
        }
        let joined = join_chunks(chunks);

        match self.completion.complete(SUMMARIZE_INSTRUCTION, &joined).await {
            Ok(summary) if !summary.trim().is_empty() => {
                tracing::debug!(
                    chunks = chunks.len(),
                    input_chars = joined.len(),
                    summary_chars = summary.len(),
                    "Context summarized"
                );
                Summary {
                    text: summary,
                    degraded: None,
                }
            }
            Ok(_) => {
                tracing::warn!("Summarizer returned no content; using raw context");
                Summary {
                    text: joined,
                    degraded: Some(SummarizationDegraded::EmptyResponse),
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Summarizer failed; using raw context");
                Summary {
                    text: joined,
                    degraded: Some(SummarizationDegraded::Backend(error)),
                }
            }
        }
    }
}

/// Concatenate chunk texts with a blank line between them, labelling known source files.
pub fn join_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| match &chunk.file_name {
            Some(file_name) => format!("File: {file_name}\n{}", chunk.text),
            None => chunk.text.clone(),
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
