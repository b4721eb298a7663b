//! Shared state and plumbing for tool handlers

use rmcp::model::JsonObject;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::client::RailgunApi;
use crate::config::Settings;
use crate::error::{ToolError, ToolResult};

/// Everything a tool handler needs: the API handle and the loaded settings
#[derive(Clone)]
pub struct ToolContext {
    pub api: Arc<dyn RailgunApi>,
    pub settings: Arc<Settings>,
}

impl ToolContext {
    pub fn new(api: Arc<dyn RailgunApi>, settings: Settings) -> Self {
        Self {
            api,
            settings: Arc::new(settings),
        }
    }

    /// Explicit password, else the configured wallet password
    pub fn wallet_password(&self, explicit: Option<String>) -> ToolResult<String> {
        explicit
            .filter(|p| !p.is_empty())
            .or_else(|| self.settings.wallet_password.clone())
            .ok_or_else(|| {
                ToolError::invalid_params(
                    "Wallet password required. Set RAILGUN_WALLET_PASSWORD or provide password parameter",
                )
            })
    }

    /// The configured wallet password as a JSON value (null when unset)
    pub fn configured_password(&self) -> Value {
        self.settings
            .wallet_password
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

/// Deserialize tool arguments into a typed parameter struct.
///
/// Missing arguments are treated as an empty object so tools whose
/// parameters are all optional can be called bare.
pub fn parse_args<T: DeserializeOwned>(args: Option<&JsonObject>) -> ToolResult<T> {
    let object = args.cloned().unwrap_or_default();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| ToolError::invalid_params(format!("Invalid parameters: {}", e)))
}

/// A field the API must return
pub fn field(response: &Value, key: &str) -> ToolResult {
    response
        .get(key)
        .cloned()
        .ok_or_else(|| ToolError::decode(format!("missing field '{}'", key)))
}

/// A field the API may omit; absent becomes null
pub fn opt_field(response: &Value, key: &str) -> Value {
    response.get(key).cloned().unwrap_or(Value::Null)
}

/// A field that must be a JSON array
pub fn array_field<'a>(response: &'a Value, key: &str) -> ToolResult<&'a Vec<Value>> {
    response
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::decode(format!("expected array field '{}'", key)))
}

/// Insert `value` under `key` only when present
pub fn insert_opt(body: &mut Value, key: &str, value: Option<String>) {
    if let (Some(object), Some(value)) = (body.as_object_mut(), value.filter(|v| !v.is_empty())) {
        object.insert(key.to_string(), Value::String(value));
    }
}
