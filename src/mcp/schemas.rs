//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Build the schema describing the `ask` tool input.
pub(crate) fn ask_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "query".into(),
        string_schema("Natural-language question about the repository"),
    );

    let mut repository_schema = Map::new();
    repository_schema.insert("type".into(), Value::String("string".into()));
    repository_schema.insert(
        "description".into(),
        Value::String(
            "Repository identifier the chunks were indexed under; only its chunks are used as context."
                .into(),
        ),
    );
    repository_schema.insert("minLength".into(), Value::from(1));
    properties.insert("repository_id".into(), Value::Object(repository_schema));

    finalize_object_schema(properties, &["query", "repository_id"])
}

/// Schema for tools that accept no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_schema_requires_query_and_repository() {
        let schema = ask_input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["required"],
            Value::Array(vec!["query".into(), "repository_id".into()])
        );
        assert_eq!(schema["properties"]["repository_id"]["minLength"], 1);
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn empty_schema_has_no_required_keys() {
        let schema = empty_object_schema();
        assert!(schema.get("required").is_none());
    }
}
