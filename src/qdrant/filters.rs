//! Filter and payload helpers for repository-scoped Qdrant queries.

use serde_json::{Map, Value, json};

use super::types::PayloadFields;
use crate::pipeline::Chunk;

/// Compose the equality filter restricting a query to one repository.
pub fn build_repository_filter(field: &str, repository_id: &str) -> Value {
    json!({
        "must": [
            {
                "key": field,
                "match": { "value": repository_id }
            }
        ]
    })
}

/// Map a Qdrant payload onto a chunk, returning `None` when text or repository are missing.
pub fn payload_to_chunk(payload: &Map<String, Value>, fields: &PayloadFields) -> Option<Chunk> {
    let text = payload.get(&fields.text).and_then(Value::as_str)?;
    if text.trim().is_empty() {
        return None;
    }
    let repository_id = payload_string(payload, &fields.repository)?;
    let chunk = Chunk::new(text, repository_id);
    Some(match payload_string(payload, &fields.file) {
        Some(file_name) => chunk.with_file_name(file_name),
        None => chunk,
    })
}

fn payload_string(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(value)) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}
