//! Handler for the metrics tool.

use crate::pipeline::QueryApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current pipeline counters.
pub(crate) async fn handle_metrics(pipeline: &dyn QueryApi) -> Result<CallToolResult, McpError> {
    let snapshot = pipeline.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "queriesStarted": snapshot.queries_started,
        "queriesAnswered": snapshot.queries_answered,
        "invalidQueries": snapshot.invalid_queries,
        "retrievalFailures": snapshot.retrieval_failures,
        "generationFailures": snapshot.generation_failures,
        "timeouts": snapshot.timeouts,
        "degradedOptimizations": snapshot.degraded_optimizations,
        "degradedRerankScores": snapshot.degraded_rerank_scores,
        "degradedSummaries": snapshot.degraded_summaries,
        "chunksRetrieved": snapshot.chunks_retrieved,
        "redactionsApplied": snapshot.redactions_applied,
    })))
}
