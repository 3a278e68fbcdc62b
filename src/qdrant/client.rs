//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::pipeline::Chunk;
use crate::qdrant::{
    filters::{build_repository_filter, payload_to_chunk},
    types::{
        ListCollectionsResponse, PayloadFields, QdrantError, QdrantHealthSnapshot, QueryResponse,
        QueryResponseResult, ScoredPoint,
    },
};
use crate::store::{VectorStore, VectorStoreError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};

/// Lightweight HTTP client for repository-scoped Qdrant queries.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
    pub(crate) fields: PayloadFields,
}

impl QdrantService {
    /// Construct a client from the supplied configuration.
    pub fn new(config: &Config, client: Client) -> Result<Self, QdrantError> {
        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %config.qdrant_collection_name,
            has_api_key = %config
                .qdrant_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
            collection: config.qdrant_collection_name.clone(),
            fields: PayloadFields {
                text: config.qdrant_text_field.clone(),
                repository: config.qdrant_repository_field.clone(),
                file: config.qdrant_file_field.clone(),
            },
        })
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections").send().await?;

        if response.status().is_success() {
            let payload: ListCollectionsResponse = response.json().await?;
            let names = payload
                .result
                .collections
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            Ok(names)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list collections");
            Err(error)
        }
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter_value) = filter
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Probe Qdrant to surface a lightweight health snapshot.
    pub async fn health(&self) -> QdrantHealthSnapshot {
        match self.list_collections().await {
            Ok(collections) => QdrantHealthSnapshot {
                reachable: true,
                collection_present: collections.iter().any(|name| name == &self.collection),
                error: None,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Qdrant health probe failed");
                QdrantHealthSnapshot {
                    reachable: false,
                    collection_present: false,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn nearest_neighbors(
        &self,
        vector: Vec<f32>,
        repository_id: &str,
        limit: usize,
    ) -> Result<Vec<Chunk>, VectorStoreError> {
        let filter = build_repository_filter(&self.fields.repository, repository_id);
        let points = self
            .search_points(&self.collection, vector, Some(filter), limit)
            .await?;

        let total = points.len();
        let chunks: Vec<Chunk> = points
            .into_iter()
            .filter_map(|point| {
                point
                    .payload
                    .as_ref()
                    .and_then(|payload| payload_to_chunk(payload, &self.fields))
            })
            .collect();
        if chunks.len() < total {
            tracing::debug!(
                collection = %self.collection,
                skipped = total - chunks.len(),
                "Skipped points without usable payload"
            );
        }
        Ok(chunks)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn service(base_url: String) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("reporag-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
            collection: "repo-chunks".into(),
            fields: PayloadFields::default(),
        }
    }

    #[tokio::test]
    async fn nearest_neighbors_sends_repository_filter() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/repo-chunks/points/query")
                    .json_body_partial(
                        r#"{
                            "limit": 8,
                            "filter": {
                                "must": [
                                    { "key": "repo_id", "match": { "value": "acme/api" } }
                                ]
                            }
                        }"#,
                    );
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": 7,
                                "score": 0.91,
                                "payload": {
                                    "content": "fn authenticate() {}",
                                    "repo_id": "acme/api",
                                    "file_name": "src/auth.rs"
                                }
                            },
                            {
                                "id": "b7c1",
                                "score": 0.42,
                                "payload": { "repo_id": "acme/api" }
                            }
                        ]
                    }
                }));
            })
            .await;

        let chunks = service(server.base_url())
            .nearest_neighbors(vec![0.1, 0.2], "acme/api", 8)
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "fn authenticate() {}");
        assert_eq!(chunks[0].file_name.as_deref(), Some("src/auth.rs"));
    }

    #[tokio::test]
    async fn search_points_accepts_flat_result_list() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        { "id": { "uuid": "5c56c793" }, "score": 0.5, "payload": { "content": "x" } }
                    ]
                }));
            })
            .await;

        let points = service(server.base_url())
            .search_points("demo", vec![1.0], None, 3)
            .await
            .expect("search request");

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "5c56c793");
        assert!((points[0].score - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn search_failure_surfaces_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/repo-chunks/points/query");
                then.status(503).body("overloaded");
            })
            .await;

        let error = service(server.base_url())
            .nearest_neighbors(vec![0.1], "acme/api", 8)
            .await
            .expect_err("store failure");

        assert!(matches!(
            error,
            VectorStoreError::Qdrant(QdrantError::UnexpectedStatus { status, .. })
                if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn health_reports_collection_presence() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": { "collections": [{ "name": "repo-chunks" }] }
                }));
            })
            .await;

        let snapshot = service(server.base_url()).health().await;
        assert!(snapshot.reachable);
        assert!(snapshot.collection_present);
        assert!(snapshot.error.is_none());
    }
}
