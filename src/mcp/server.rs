//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    config::Config,
    mcp::{
        format::{BackendSummary, health_payload, json_resource_contents, serialize_json},
        handlers::{ask::handle_ask, metrics::handle_metrics},
        registry, schemas,
    },
    pipeline::{PipelineBuildError, QueryApi, RagPipeline},
    qdrant::QdrantService,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const HEALTH_URI: &str = "mcp://health";
const USAGE_URI: &str = "mcp://usage";

/// MCP server answering repository questions over stdio.
#[derive(Clone)]
pub struct RepoRagMcpServer {
    pipeline: Arc<dyn QueryApi>,
    qdrant: Arc<QdrantService>,
    backends: Arc<BackendSummary>,
    registry: Arc<registry::Registry>,
}

impl RepoRagMcpServer {
    /// Create a server over an existing pipeline; `qdrant` backs the health resource.
    pub fn new(pipeline: Arc<dyn QueryApi>, qdrant: Arc<QdrantService>, config: &Config) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(HEALTH_URI, resource_health);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("ask", tool_ask);
        registry.register_tool("metrics", tool_metrics);

        Self {
            pipeline,
            qdrant,
            backends: Arc::new(BackendSummary::from_config(config)),
            registry: Arc::new(registry),
        }
    }

    /// Build the HTTP-backed pipeline and health probe described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, PipelineBuildError> {
        let pipeline = RagPipeline::from_config(config)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("reporag/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let qdrant = QdrantService::new(config, http)?;
        Ok(Self::new(Arc::new(pipeline), Arc::new(qdrant), config))
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("ask"),
                title: Some("Ask Repository".to_string()),
                description: Some(Cow::Borrowed(
                    "Answer a question about a code repository using only chunks indexed for that repository.",
                )),
                input_schema: Arc::new(schemas::ask_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Ask Repository")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check answered queries, failures and degraded stages at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description =
            Some("Configured embedding and completion backends plus Qdrant reachability".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description = Some("How to phrase questions and scope them to a repository".into());

        vec![health.no_annotation(), usage.no_annotation()]
    }
}

fn resource_health(
    server: &RepoRagMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let qdrant = server.qdrant.clone();
    let backends = server.backends.clone();
    Box::pin(async move {
        let snapshot = qdrant.health().await;
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                HEALTH_URI,
                health_payload(&backends, &snapshot),
            )],
        })
    })
}

fn resource_usage(
    _server: &RepoRagMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        let usage = serde_json::json!({
            "title": "reporag MCP Usage",
            "policy": [
                "Always pass the repository_id the code was indexed under.",
                "Ask one focused question per call.",
                "Answers only use indexed chunks; an answer saying no context was found means the repository has nothing relevant.",
                "Check `degradations` in the result when an answer looks thin.",
            ],
            "flows": [
                {
                    "name": "Ask",
                    "steps": [
                        "ask({ query, repository_id })"
                    ]
                }
            ]
        });
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage, USAGE_URI),
            )],
        })
    })
}

fn tool_ask(server: &RepoRagMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_ask(pipeline.as_ref(), request.arguments).await })
}

fn tool_metrics(
    server: &RepoRagMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_metrics(pipeline.as_ref()).await })
}

impl ServerHandler for RepoRagMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "reporag".to_string();
        implementation.title = Some("reporag MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to answer questions about an indexed code repository. Call `ask` with the question and the repository_id; answers are grounded in that repository's chunks only.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
