//! Recipe tools: multi-step DeFi interactions executed as one private transaction

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::context::{field, insert_opt, opt_field, parse_args, ToolContext};
use crate::error::ToolResult;
use crate::models::Step;
use crate::schema::tool;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateRecipeParams {
    /// Name of the recipe
    pub name: String,
    /// What the recipe does
    pub description: String,
    /// Network for the recipe
    pub network: String,
    /// Ordered steps of the recipe, forwarded to the API as given
    #[schemars(with = "Vec<Step>")]
    pub steps: Vec<JsonObject>,
}

/// Token amount given to a recipe, e.g. `{"token_address": "0x...", "amount": "1000"}`
pub type InputAmount = BTreeMap<String, String>;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteRecipeParams {
    /// Wallet to execute from
    pub wallet_id: String,
    /// Recipe to execute
    pub recipe_id: String,
    /// Token amounts used as inputs
    pub input_amounts: Vec<InputAmount>,
    /// Allowed slippage percentage (default: 0.5)
    #[serde(default = "default_slippage")]
    pub slippage_percentage: f64,
    /// Gas price in wei
    #[serde(default)]
    pub gas_price: Option<String>,
}

fn default_slippage() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EstimateRecipeGasParams {
    /// Recipe to estimate
    pub recipe_id: String,
    /// Token amounts used as inputs
    pub input_amounts: Vec<InputAmount>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SwapRecipeParams {
    /// Network for the swap
    pub network: String,
    /// Token to sell
    pub sell_token: String,
    /// Token to buy
    pub buy_token: String,
    /// DEX to route through: 0x, uniswap or sushiswap (default: 0x)
    #[serde(default = "default_dex")]
    pub dex: String,
}

fn default_dex() -> String {
    "0x".to_string()
}

pub fn get_recipe_tools() -> Vec<Tool> {
    vec![
        tool::<CreateRecipeParams>(
            "create_recipe",
            "Create a new recipe for complex DeFi interactions.",
        ),
        tool::<ExecuteRecipeParams>(
            "execute_recipe",
            "Execute a recipe with the specified inputs.",
        ),
        tool::<EstimateRecipeGasParams>(
            "estimate_recipe_gas",
            "Estimate the gas cost of executing a recipe.",
        ),
        tool::<SwapRecipeParams>(
            "create_swap_recipe",
            "Create a pre-configured swap recipe.",
        ),
    ]
}

pub async fn handle_create_recipe(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: CreateRecipeParams = parse_args(args)?;

    let response = ctx
        .api
        .post(
            "/recipes",
            &json!({
                "name": params.name,
                "description": params.description,
                "network": params.network,
                "steps": params.steps,
            }),
        )
        .await?;

    Ok(json!({
        "recipe_id": field(&response, "recipe_id")?,
        "message": "Recipe created successfully",
    }))
}

pub async fn handle_execute_recipe(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: ExecuteRecipeParams = parse_args(args)?;

    let mut body = json!({
        "wallet_id": params.wallet_id,
        "recipe_id": params.recipe_id,
        "input_amounts": params.input_amounts,
        "slippage_percentage": params.slippage_percentage,
        "password": ctx.configured_password(),
    });
    insert_opt(&mut body, "gas_price", params.gas_price);

    let response = ctx.api.post("/recipes/execute", &body).await?;

    Ok(json!({
        "transaction_id": field(&response, "transaction_id")?,
        "tx_hash": field(&response, "tx_hash")?,
        "status": field(&response, "status")?,
        "outputs": response.get("outputs").cloned().unwrap_or_else(|| json!([])),
        "message": "Recipe execution submitted successfully",
    }))
}

pub async fn handle_estimate_recipe_gas(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: EstimateRecipeGasParams = parse_args(args)?;

    let response = ctx
        .api
        .post(
            "/recipes/estimate-gas",
            &json!({
                "recipe_id": params.recipe_id,
                "input_amounts": params.input_amounts,
            }),
        )
        .await?;

    Ok(json!({
        "estimated_gas": field(&response, "estimated_gas")?,
        "gas_breakdown": response.get("gas_breakdown").cloned().unwrap_or_else(|| json!({})),
        "estimated_cost_wei": opt_field(&response, "estimated_cost_wei"),
    }))
}

pub async fn handle_create_swap_recipe(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: SwapRecipeParams = parse_args(args)?;

    let response = ctx
        .api
        .post(
            "/recipes/templates/swap",
            &json!({
                "network": params.network,
                "sell_token": params.sell_token,
                "buy_token": params.buy_token,
                "dex": params.dex,
            }),
        )
        .await?;

    Ok(json!({
        "recipe_id": field(&response, "recipe_id")?,
        "recipe_name": field(&response, "recipe_name")?,
        "steps": field(&response, "steps")?,
        "message": "Swap recipe created successfully",
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
    async fn test_create_recipe_forwards_documented_steps() {
        let api = Arc::new(FakeApi::new().on_post("/recipes", json!({"recipe_id": "r1"})));
        let ctx = context(api.clone());

        let result = handle_create_recipe(
            &ctx,
            Some(&args(json!({
                "name": "Private swap",
                "description": "Swap USDC for DAI",
                "network": "ethereum",
                "steps": [
                    {"id": "1", "type": "unshield", "description": "Unshield USDC"},
                    {"id": "2", "type": "swap", "function_name": "swap"},
                    {"id": "3", "type": "shield"}
                ]
            }))),
        )
        .await
        .unwrap();

        assert_eq!(result["recipe_id"], "r1");
        let steps = api.calls()[0].payload["steps"].as_array().unwrap().clone();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1]["type"], "swap");
        assert_eq!(steps[1]["function_name"], "swap");
    }

    #[tokio::test]
    async fn test_create_recipe_forwards_free_form_steps() {
        let api = Arc::new(FakeApi::new().on_post("/recipes", json!({"recipe_id": "r9"})));
        let ctx = context(api.clone());

        let steps = json!([
            {"type": "swap", "inputs": [{"token_address": "0xusdc", "amount": "1000"}]},
            {"action": "bridge"}
        ]);
        let result = handle_create_recipe(
            &ctx,
            Some(&args(json!({
                "name": "n",
                "description": "d",
                "network": "ethereum",
                "steps": steps.clone()
            }))),
        )
        .await
        .unwrap();

        assert_eq!(result["recipe_id"], "r9");
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].endpoint, "/recipes");
        assert_eq!(calls[0].payload["steps"], steps);
    }

    #[test]
    fn test_create_recipe_schema_documents_steps() {
        let tools = get_recipe_tools();
        let schema = Value::Object((*tools[0].input_schema).clone());

        assert_eq!(schema["properties"]["steps"]["type"], "array");
        assert!(schema.to_string().contains("add_liquidity"));
    }

    #[tokio::test]
    async fn test_create_recipe_requires_object_steps() {
        let api = Arc::new(FakeApi::new());
        let ctx = context(api.clone());

        let err = handle_create_recipe(
            &ctx,
            Some(&args(json!({
                "name": "n",
                "description": "d",
                "network": "ethereum",
                "steps": ["swap"]
            }))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_recipe_defaults() {
        let api = Arc::new(FakeApi::new().on_post(
            "/recipes/execute",
            json!({"transaction_id": "t1", "tx_hash": "0x1", "status": "pending"}),
        ));
        let ctx = context(api.clone());

        let result = handle_execute_recipe(
            &ctx,
            Some(&args(json!({
                "wallet_id": "w1",
                "recipe_id": "r1",
                "input_amounts": [{"token_address": "0xusdc", "amount": "100"}]
            }))),
        )
        .await
        .unwrap();

        assert_eq!(result["outputs"], json!([]));
        let payload = &api.calls()[0].payload;
        assert_eq!(payload["slippage_percentage"], 0.5);
        assert_eq!(payload["input_amounts"][0]["amount"], "100");
        assert!(payload.get("gas_price").is_none());
    }

    #[tokio::test]
    async fn test_estimate_recipe_gas_optional_fields() {
        let api = Arc::new(
            FakeApi::new().on_post("/recipes/estimate-gas", json!({"estimated_gas": 450000})),
        );
        let ctx = context(api);

        let result = handle_estimate_recipe_gas(
            &ctx,
            Some(&args(json!({"recipe_id": "r1", "input_amounts": []}))),
        )
        .await
        .unwrap();

        assert_eq!(result["estimated_gas"], 450000);
        assert_eq!(result["gas_breakdown"], json!({}));
        assert_eq!(result["estimated_cost_wei"], Value::Null);
    }

    #[tokio::test]
    async fn test_swap_recipe_default_dex() {
        let api = Arc::new(FakeApi::new().on_post(
            "/recipes/templates/swap",
            json!({"recipe_id": "r2", "recipe_name": "USDC->DAI", "steps": []}),
        ));
        let ctx = context(api.clone());

        handle_create_swap_recipe(
            &ctx,
            Some(&args(json!({"network": "ethereum", "sell_token": "0xa", "buy_token": "0xb"}))),
        )
        .await
        .unwrap();

        assert_eq!(api.calls()[0].payload["dex"], "0x");
    }
}
