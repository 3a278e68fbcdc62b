//! Model Context Protocol (MCP) integration for reporag.
//!
//! This module wires the answering pipeline into an MCP server so editors and agent hosts can ask
//! questions about indexed repositories over stdio. The surface area consists of:
//!
//! - Tools: `ask` and `metrics`.
//! - Resources: `mcp://health` and `mcp://usage`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::RepoRagMcpServer;
