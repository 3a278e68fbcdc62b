//! Query rewriting ahead of vector search.

use std::sync::Arc;

use super::error::OptimizationFailure;
use super::types::OptimizedQuery;
use crate::completion::CompletionClient;

pub(crate) const OPTIMIZE_INSTRUCTION: &str = "Rephrase the query for better document search. \
Respond with the rewritten query only.";

/// Rewrites user questions into search-friendly queries.
pub struct QueryOptimizer {
    completion: Arc<dyn CompletionClient>,
}

impl QueryOptimizer {
    /// Create an optimizer backed by the given completion client.
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Rewrite `query`; keeps the original when the backend answers with nothing.
    pub async fn optimize(&self, query: &str) -> Result<OptimizedQuery, OptimizationFailure> {
        let rewritten = self.completion.complete(OPTIMIZE_INSTRUCTION, query).await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            tracing::debug!("Optimizer returned no content; keeping original query");
            return Ok(OptimizedQuery {
                text: query.to_string(),
                rewritten: false,
            });
        }

        tracing::debug!(optimized = rewritten, "Query optimized");
        Ok(OptimizedQuery {
            text: rewritten.to_string(),
            rewritten: true,
        })
    }
}
