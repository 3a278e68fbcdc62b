#![deny(missing_docs)]

//! Retrieval-augmented question answering over indexed code repositories.

/// HTTP routing and REST handlers.
pub mod api;
/// Chat completion client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline counters.
pub mod metrics;
/// The six-stage answering pipeline.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// Vector store abstraction consumed by retrieval.
pub mod store;
