//! Handler for the `ask` tool.

use crate::pipeline::{PipelineError, QueryApi};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::parse_arguments;

/// Request payload accepted by the `ask` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AskToolRequest {
    /// Question about the repository.
    pub(crate) query: String,
    /// Repository whose chunks may ground the answer.
    pub(crate) repository_id: String,
}

/// Handle the `ask` tool by running the full answering pipeline.
pub(crate) async fn handle_ask(
    pipeline: &dyn QueryApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AskToolRequest = parse_arguments(arguments)?;
    if args.query.trim().is_empty() {
        return Err(McpError::invalid_params("`query` must not be empty", None));
    }
    if args.repository_id.trim().is_empty() {
        return Err(McpError::invalid_params(
            "`repository_id` must not be empty",
            None,
        ));
    }

    let report = pipeline
        .answer(&args.query, &args.repository_id)
        .await
        .map_err(pipeline_error)?;

    let degradations: Vec<_> = report
        .degradations
        .iter()
        .map(|degradation| {
            json!({
                "stage": degradation.stage(),
                "message": degradation.to_string(),
            })
        })
        .collect();

    Ok(CallToolResult::structured(json!({
        "answer": report.answer,
        "repositoryId": args.repository_id,
        "runId": report.run_id,
        "optimizedQuery": report.optimized_query,
        "retrievedChunks": report.retrieved_chunks,
        "summarizedChunks": report.summarized_chunks,
        "redactions": report.redactions,
        "degradations": degradations,
    })))
}

fn pipeline_error(error: PipelineError) -> McpError {
    let data = Some(json!({ "kind": error.kind() }));
    match error {
        PipelineError::InvalidQuery(message) => McpError::invalid_params(message, data),
        other => McpError::internal_error(other.to_string(), data),
    }
}
