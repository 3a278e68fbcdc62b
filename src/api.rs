//! HTTP surface for reporag.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /query` – Answer a question about one repository. Returns the answer together with the
//!   run id, the query used for retrieval, chunk counters and any degraded stages.
//! - `GET /metrics` – Observe pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same pipeline with the MCP server and the CLI, so behavior is
//! identical across interfaces.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{PipelineError, PipelineReport, QueryApi, Stage};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the query API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QueryApi + 'static,
{
    Router::new()
        .route("/query", post(query_repository::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /query` endpoint.
#[derive(Deserialize)]
struct QueryRequest {
    /// Natural-language question.
    query: String,
    /// Repository whose chunks may be used as context.
    repository_id: String,
}

/// Success response for the `POST /query` endpoint.
#[derive(Serialize)]
pub(crate) struct QueryResponse {
    pub(crate) run_id: String,
    pub(crate) answer: String,
    pub(crate) optimized_query: String,
    pub(crate) retrieved_chunks: usize,
    pub(crate) summarized_chunks: usize,
    pub(crate) redactions: usize,
    pub(crate) degradations: Vec<DegradationEntry>,
}

/// One degraded stage in a query response.
#[derive(Serialize)]
pub(crate) struct DegradationEntry {
    pub(crate) stage: Stage,
    pub(crate) message: String,
}

impl From<PipelineReport> for QueryResponse {
    fn from(report: PipelineReport) -> Self {
        Self {
            run_id: report.run_id,
            answer: report.answer,
            optimized_query: report.optimized_query,
            retrieved_chunks: report.retrieved_chunks,
            summarized_chunks: report.summarized_chunks,
            redactions: report.redactions,
            degradations: report
                .degradations
                .iter()
                .map(|degradation| DegradationEntry {
                    stage: degradation.stage(),
                    message: degradation.to_string(),
                })
                .collect(),
        }
    }
}

/// Answer a question about a repository.
async fn query_repository<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: QueryApi,
{
    let report = service
        .answer(&request.query, &request.repository_id)
        .await?;
    tracing::info!(
        run_id = %report.run_id,
        repository_id = %request.repository_id,
        degradations = report.degradations.len(),
        "Query request completed"
    );
    Ok(Json(report.into()))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: QueryApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/query",
                description: "Answer a question using only chunks indexed for the given repository. Response returns { \"answer\": string, \"degradations\": [...] }.",
                request_example: Some(json!({
                    "query": "How does authentication work?",
                    "repository_id": "acme/api"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(PipelineError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PipelineError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            PipelineError::Retrieval(_) | PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::completion::CompletionError;
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{
        Degradation, GenerationFailure, OptimizationFailure, PipelineError, PipelineReport,
        QueryApi, Stage,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_query_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let query = commands
            .iter()
            .find(|cmd| cmd.name == "query")
            .expect("query command present");

        assert_eq!(query.method, "POST");
        assert_eq!(query.path, "/query");
        assert!(query.description.to_lowercase().contains("repository"));
    }

    #[tokio::test]
    async fn query_route_returns_answer_and_degradations() {
        let service = Arc::new(StubQueryService::answering());
        let app = create_router(service.clone());

        let response = app
            .oneshot(query_request(json!({
                "query": "How does auth work?",
                "repository_id": "acme/api"
            })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["answer"], "Auth lives in src/auth.rs.");
        assert_eq!(json["run_id"], "run-1");
        assert_eq!(json["degradations"][0]["stage"], "optimize");
        assert!(
            json["degradations"][0]["message"]
                .as_str()
                .expect("message")
                .contains("query optimization failed")
        );

        let calls = service.calls.lock().await.clone();
        assert_eq!(
            calls,
            vec![("How does auth work?".to_string(), "acme/api".to_string())]
        );
    }

    #[tokio::test]
    async fn pipeline_errors_map_to_status_codes() {
        let cases = [
            (
                PipelineError::InvalidQuery("query must not be empty".into()),
                StatusCode::BAD_REQUEST,
                "invalid_query",
            ),
            (
                PipelineError::Generation(GenerationFailure(CompletionError::GenerationFailed(
                    "model crashed".into(),
                ))),
                StatusCode::BAD_GATEWAY,
                "generation_failure",
            ),
            (
                PipelineError::Timeout {
                    stage: Stage::Rerank,
                    timeout: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
                "pipeline_timeout",
            ),
            (
                PipelineError::Unavailable,
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
            ),
        ];

        for (error, status, kind) in cases {
            let app = create_router(Arc::new(StubQueryService::failing(error)));
            let response = app
                .oneshot(query_request(json!({ "query": "q", "repository_id": "r" })))
                .await
                .expect("router response");

            assert_eq!(response.status(), status);
            let json = json_body(response).await;
            assert_eq!(json["error"]["kind"], kind);
        }
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let app = create_router(Arc::new(StubQueryService::answering()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["queries_answered"], 4);
    }

    fn query_request(payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    struct StubQueryService {
        calls: Mutex<Vec<(String, String)>>,
        failure: std::sync::Mutex<Option<PipelineError>>,
    }

    impl StubQueryService {
        fn answering() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: std::sync::Mutex::new(None),
            }
        }

        fn failing(error: PipelineError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: std::sync::Mutex::new(Some(error)),
            }
        }
    }

    #[async_trait]
    impl QueryApi for StubQueryService {
        async fn answer(
            &self,
            query: &str,
            repository_id: &str,
        ) -> Result<PipelineReport, PipelineError> {
            self.calls
                .lock()
                .await
                .push((query.to_string(), repository_id.to_string()));
            if let Some(error) = self.failure.lock().expect("failure lock").take() {
                return Err(error);
            }
            Ok(PipelineReport {
                run_id: "run-1".into(),
                answer: "Auth lives in src/auth.rs.".into(),
                optimized_query: "authentication".into(),
                retrieved_chunks: 8,
                summarized_chunks: 3,
                redactions: 0,
                degradations: vec![Degradation::Optimization(OptimizationFailure(
                    CompletionError::ProviderUnavailable("offline".into()),
                ))],
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                queries_answered: 4,
                ..MetricsSnapshot::default()
            }
        }
    }
}
