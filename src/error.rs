//! Error and result types for tool handlers

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Coarse classification of a tool failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Arguments were missing or malformed, or failed a local check
    InvalidParams,
    /// The server is not configured to perform the call
    Config,
    /// The request never produced an HTTP response
    Transport,
    /// The API answered with a non-success status
    Api,
    /// The API answered 2xx but the body was not what we expected
    Decode,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    Config(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected API response: {0}")]
    Decode(String),
}

impl ToolError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParams(_) => ErrorKind::InvalidParams,
            Self::Config(_) => ErrorKind::Config,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Api { .. } => ErrorKind::Api,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }
}

pub type ToolResult<T = Value> = Result<T, ToolError>;

/// Final result of a tool invocation, as reported to the MCP client
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Map<String, Value>),
    Failure { kind: ErrorKind, message: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// JSON object carrying a boolean `success` flag.
    ///
    /// Successes merge the payload fields in; failures carry `error` and `error_kind`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Success(payload) => {
                let mut object = payload.clone();
                object.insert("success".to_string(), Value::Bool(true));
                Value::Object(object)
            }
            Self::Failure { kind, message } => json!({
                "success": false,
                "error": message,
                "error_kind": kind,
            }),
        }
    }

    pub fn into_call_result(self) -> CallToolResult {
        let text = serde_json::to_string_pretty(&self.to_json())
            .unwrap_or_else(|e| format!(r#"{{"success": false, "error": "{}"}}"#, e));

        if self.is_success() {
            CallToolResult::success(vec![Content::text(text)])
        } else {
            CallToolResult::error(vec![Content::text(text)])
        }
    }
}

impl From<ToolResult> for ToolOutcome {
    fn from(result: ToolResult) -> Self {
        match result {
            Ok(Value::Object(payload)) => Self::Success(payload),
            Ok(other) => {
                let mut payload = Map::new();
                payload.insert("result".to_string(), other);
                Self::Success(payload)
            }
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let err = ToolError::Api {
            status: 503,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "API request failed: 503 - upstream down");
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn test_success_outcome_sets_flag() {
        let outcome = ToolOutcome::from(Ok(json!({"wallet_id": "w1"})));
        let value = outcome.to_json();

        assert_eq!(value["success"], true);
        assert_eq!(value["wallet_id"], "w1");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let value = ToolOutcome::from(Ok(json!([1, 2]))).to_json();
        assert_eq!(value["success"], true);
        assert_eq!(value["result"], json!([1, 2]));
    }

    #[test]
    fn test_failure_outcome_reports_kind() {
        let outcome = ToolOutcome::from(Err(ToolError::invalid_params("Maximum 10 wallets per batch")));
        let value = outcome.to_json();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Maximum 10 wallets per batch");
        assert_eq!(value["error_kind"], "invalid_params");
    }

    #[test]
    fn test_call_result_marks_failures_as_errors() {
        let failure = ToolOutcome::Failure {
            kind: ErrorKind::Config,
            message: "not configured".to_string(),
        }
        .into_call_result();
        assert_eq!(failure.is_error, Some(true));

        let success = ToolOutcome::Success(Map::new()).into_call_result();
        assert_eq!(success.is_error, Some(false));
        assert_eq!(success.content.len(), 1);
    }
}
