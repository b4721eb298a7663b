//! Tool definitions derived from typed parameter structs

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Parameters for tools that take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

/// JSON schema for `T`, as an MCP tool input schema
pub fn input_schema<T: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(T);
    let mut object = match serde_json::to_value(&schema) {
        Ok(Value::Object(object)) => object,
        _ => JsonObject::new(),
    };

    // MCP clients expect a bare object schema
    object.remove("$schema");
    object.remove("title");
    object.insert("type".to_string(), Value::String("object".to_string()));
    object
        .entry("properties")
        .or_insert_with(|| Value::Object(JsonObject::new()));
    object
}

/// Build a tool whose input schema is generated from `T`
pub fn tool<T: JsonSchema>(name: &str, description: &str) -> Tool {
    Tool::new(
        name.to_string(),
        description.to_string(),
        Arc::new(input_schema::<T>()),
    )
}
