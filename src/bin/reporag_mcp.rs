//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes the repository question-answering pipeline over stdio.
//! This mode is designed for editor/agent integrations and shares all runtime configuration with
//! the HTTP binary.
use anyhow::{Context, Result};
use reporag::{config, logging, mcp::RepoRagMcpServer};
use rmcp::{service::ServiceExt, transport::stdio};

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();

    let server = RepoRagMcpServer::from_config(config::get_config())
        .context("failed to assemble answering pipeline")?;

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
