use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Default Ollama endpoint used when `OLLAMA_URL` is unset.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
/// Default OpenAI-compatible endpoint used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Number of chunks fetched from the vector store per query.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 8;
/// Number of reranked chunks handed to the summarizer.
pub const DEFAULT_SUMMARY_TOP_N: usize = 3;
/// Maximum number of scoring requests issued concurrently while reranking.
pub const DEFAULT_RERANK_CONCURRENCY: usize = 8;
/// Per-query deadline applied when `PIPELINE_TIMEOUT_SECS` is unset.
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration for the reporag services.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance holding repository chunks.
    pub qdrant_url: String,
    /// Name of the Qdrant collection that stores repository chunks.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Payload field carrying the chunk text.
    pub qdrant_text_field: String,
    /// Payload field carrying the repository identifier.
    pub qdrant_repository_field: String,
    /// Payload field carrying the source file name.
    pub qdrant_file_field: String,
    /// Embedding provider used to vectorize queries.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the vectors stored in the collection.
    pub embedding_dimension: usize,
    /// Chat completion provider used by every language-model stage.
    pub completion_provider: CompletionProvider,
    /// Chat model identifier passed to the provider.
    pub completion_model: String,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// API key for OpenAI-compatible providers.
    pub openai_api_key: Option<String>,
    /// Optional override for the OpenAI-compatible base URL.
    pub openai_base_url: Option<String>,
    /// Number of chunks retrieved per query.
    pub retrieval_limit: usize,
    /// Number of reranked chunks summarized into the context.
    pub summary_top_n: usize,
    /// Upper bound on concurrent scoring calls during reranking.
    pub rerank_concurrency: usize,
    /// Per-query deadline; `None` disables the timeout.
    pub pipeline_timeout: Option<Duration>,
    /// Optional cap on concurrently running pipelines.
    pub max_concurrent_queries: Option<usize>,
    /// Optional JSON file with additional sensitivity patterns.
    pub sensitive_patterns_file: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
}

/// Supported chat completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI (or compatible) chat completions API.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let completion_provider: CompletionProvider =
            load_env("COMPLETION_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("COMPLETION_PROVIDER".to_string())
            })?;
        let embedding_provider: EmbeddingProvider =
            load_env("EMBEDDING_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
            })?;
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        let needs_openai = completion_provider == CompletionProvider::OpenAI
            || embedding_provider == EmbeddingProvider::OpenAI;
        if needs_openai && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        let timeout_secs: u64 = parse_optional("PIPELINE_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_PIPELINE_TIMEOUT_SECS);

        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            qdrant_text_field: load_env_optional("QDRANT_TEXT_FIELD")
                .unwrap_or_else(|| "content".to_string()),
            qdrant_repository_field: load_env_optional("QDRANT_REPOSITORY_FIELD")
                .unwrap_or_else(|| "repo_id".to_string()),
            qdrant_file_field: load_env_optional("QDRANT_FILE_FIELD")
                .unwrap_or_else(|| "file_name".to_string()),
            embedding_provider,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?.parse().map_err(|_| {
                ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string())
            })?,
            completion_provider,
            completion_model: load_env("COMPLETION_MODEL")?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            retrieval_limit: positive("RETRIEVAL_LIMIT", DEFAULT_RETRIEVAL_LIMIT)?,
            summary_top_n: positive("SUMMARY_TOP_N", DEFAULT_SUMMARY_TOP_N)?,
            rerank_concurrency: positive("RERANK_CONCURRENCY", DEFAULT_RERANK_CONCURRENCY)?,
            pipeline_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_concurrent_queries: parse_optional::<usize>("MAX_CONCURRENT_QUERIES")?
                .filter(|value| *value > 0),
            sensitive_patterns_file: load_env_optional("SENSITIVE_PATTERNS_FILE"),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Ollama base URL with the default applied.
    pub fn ollama_base_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// OpenAI-compatible base URL with the default applied.
    pub fn openai_base_url(&self) -> &str {
        self.openai_base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn positive(key: &str, default: usize) -> Result<usize, ConfigError> {
    match parse_optional::<usize>(key)? {
        Some(0) => Err(ConfigError::InvalidValue(key.to_string())),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for CompletionProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        completion_provider = ?config.completion_provider,
        retrieval_limit = config.retrieval_limit,
        summary_top_n = config.summary_top_n,
        timeout = ?config.pipeline_timeout,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}


/// Deterministic configuration used by unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        qdrant_url: "http://127.0.0.1:6333".into(),
        qdrant_collection_name: "repo-chunks".into(),
        qdrant_api_key: None,
        qdrant_text_field: "content".into(),
        qdrant_repository_field: "repo_id".into(),
        qdrant_file_field: "file_name".into(),
        embedding_provider: EmbeddingProvider::Ollama,
        embedding_model: "nomic-embed-text".into(),
        embedding_dimension: 768,
        completion_provider: CompletionProvider::Ollama,
        completion_model: "llama3".into(),
        ollama_url: None,
        openai_api_key: None,
        openai_base_url: None,
        retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
        summary_top_n: DEFAULT_SUMMARY_TOP_N,
        rerank_concurrency: DEFAULT_RERANK_CONCURRENCY,
        pipeline_timeout: Some(Duration::from_secs(DEFAULT_PIPELINE_TIMEOUT_SECS)),
        max_concurrent_queries: None,
        sensitive_patterns_file: None,
        server_port: None,
    }
}
