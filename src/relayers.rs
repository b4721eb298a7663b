//! Relayer discovery and submission

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::context::{array_field, field, opt_field, parse_args, ToolContext};
use crate::error::ToolResult;
use crate::schema::tool;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetRelayersParams {
    /// Network to list relayers for
    pub network: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmitToRelayerParams {
    /// Serialized transaction data
    pub transaction_data: String,
    /// ID of the relayer to use
    pub relayer_id: String,
    /// Transaction priority: low, standard or high (default: standard)
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "standard".to_string()
}

pub fn get_relayer_tools() -> Vec<Tool> {
    vec![
        tool::<GetRelayersParams>(
            "get_relayers",
            "Get the list of available relayers for a network.",
        ),
        tool::<SubmitToRelayerParams>(
            "submit_to_relayer",
            "Submit a transaction through a relayer for enhanced privacy.",
        ),
    ]
}

pub async fn handle_get_relayers(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: GetRelayersParams = parse_args(args)?;
    let response = ctx
        .api
        .get(&format!("/relayers/{}", params.network), &[])
        .await?;
    let relayers = array_field(&response, "relayers")?;

    Ok(json!({
        "network": params.network,
        "relayers": relayers,
        "count": relayers.len(),
    }))
}

pub async fn handle_submit_to_relayer(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: SubmitToRelayerParams = parse_args(args)?;

    let response = ctx
        .api
        .post(
            "/relayers/submit",
            &json!({
                "transaction_data": params.transaction_data,
                "relayer_id": params.relayer_id,
                "priority": params.priority,
            }),
        )
        .await?;

    Ok(json!({
        "relayer_transaction_id": field(&response, "relayer_transaction_id")?,
        "estimated_time": opt_field(&response, "estimated_time"),
        "fee": opt_field(&response, "fee"),
        "message": "Transaction submitted to relayer successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use crate::error::ErrorKind;
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_relayers_counts() {
        let api = Arc::new(FakeApi::new().on_get(
            "/relayers/polygon",
            json!({"relayers": [{"id": "r1"}, {"id": "r2"}, {"id": "r3"}]}),
        ));
        let ctx = context(api);

        let result = handle_get_relayers(&ctx, Some(&args(json!({"network": "polygon"}))))
            .await
            .unwrap();

        assert_eq!(result["network"], "polygon");
        assert_eq!(result["count"], 3);
    }

    #[tokio::test]
    async fn test_get_relayers_requires_list() {
        let api = Arc::new(FakeApi::new().on_get("/relayers/bsc", json!({"relayers": null})));
        let ctx = context(api);

        let err = handle_get_relayers(&ctx, Some(&args(json!({"network": "bsc"}))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_submit_to_relayer_default_priority() {
        let api = Arc::new(FakeApi::new().on_post(
            "/relayers/submit",
            json!({"relayer_transaction_id": "rt1", "fee": "1000"}),
        ));
        let ctx = context(api.clone());

        let result = handle_submit_to_relayer(
            &ctx,
            Some(&args(json!({"transaction_data": "0xdead", "relayer_id": "r1"}))),
        )
        .await
        .unwrap();

        assert_eq!(result["relayer_transaction_id"], "rt1");
        assert_eq!(result["fee"], "1000");
        assert_eq!(result["estimated_time"], Value::Null);
        assert_eq!(api.calls()[0].payload["priority"], "standard");
    }
}
