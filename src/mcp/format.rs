//! Formatting helpers shared across MCP handlers and resources.

use crate::{
    config::{CompletionProvider, Config, EmbeddingProvider},
    qdrant::QdrantHealthSnapshot,
};
use rmcp::model::ResourceContents;
use serde::Serialize;
use serde_json::{Map, Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Static description of the backends a server was configured with.
#[derive(Debug, Clone)]
pub(crate) struct BackendSummary {
    pub(crate) embedding_provider: EmbeddingProvider,
    pub(crate) embedding_model: String,
    pub(crate) embedding_dimension: usize,
    pub(crate) completion_provider: CompletionProvider,
    pub(crate) completion_model: String,
    pub(crate) qdrant_url: String,
    pub(crate) collection: String,
}

impl BackendSummary {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            embedding_provider: config.embedding_provider,
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            completion_provider: config.completion_provider,
            completion_model: config.completion_model.clone(),
            qdrant_url: config.qdrant_url.clone(),
            collection: config.qdrant_collection_name.clone(),
        }
    }
}

/// Build the health payload summarizing backend configuration and Qdrant status.
pub(crate) fn health_payload(backends: &BackendSummary, snapshot: &QdrantHealthSnapshot) -> String {
    let mut qdrant = Map::new();
    qdrant.insert("url".into(), Value::String(backends.qdrant_url.clone()));
    qdrant.insert("reachable".into(), Value::Bool(snapshot.reachable));
    qdrant.insert(
        "collection".into(),
        Value::String(backends.collection.clone()),
    );
    qdrant.insert(
        "collectionPresent".into(),
        Value::Bool(snapshot.collection_present),
    );
    if let Some(error) = snapshot.error.as_ref() {
        qdrant.insert("error".into(), Value::String(error.clone()));
    }

    let payload = json!({
        "embedding": {
            "provider": embedding_provider_label(backends.embedding_provider),
            "model": backends.embedding_model,
            "dimension": backends.embedding_dimension,
        },
        "completion": {
            "provider": completion_provider_label(backends.completion_provider),
            "model": backends.completion_model,
        },
        "qdrant": Value::Object(qdrant),
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

fn embedding_provider_label(provider: EmbeddingProvider) -> &'static str {
    match provider {
        EmbeddingProvider::Ollama => "ollama",
        EmbeddingProvider::OpenAI => "openai",
    }
}

fn completion_provider_label(provider: CompletionProvider) -> &'static str {
    match provider {
        CompletionProvider::Ollama => "ollama",
        CompletionProvider::OpenAI => "openai",
    }
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
