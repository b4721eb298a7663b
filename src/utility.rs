//! Gas, token, proof and configuration tools

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

use crate::config::Settings;
use crate::context::{array_field, field, opt_field, parse_args, ToolContext};
use crate::error::ToolResult;
use crate::models::Network;
use crate::schema::{tool, NoParams};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NetworkParams {
    /// Network name (ethereum, arbitrum, polygon, bsc)
    pub network: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifyProofParams {
    /// The proof data to verify
    pub proof_data: String,
}

pub fn get_utility_tools() -> Vec<Tool> {
    vec![
        tool::<NetworkParams>("get_gas_price", "Get current gas prices for a network."),
        tool::<NetworkParams>(
            "get_supported_tokens",
            "Get the tokens supported by Railgun on a network.",
        ),
        tool::<VerifyProofParams>("verify_proof", "Verify a zero-knowledge proof."),
        tool::<NoParams>("check_config", "Check the current configuration status."),
    ]
}

/// Host part of an RPC URL, so keys embedded in the path are never shown
pub fn rpc_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Redacted view of the settings: secrets as booleans, RPC URLs as hosts
pub fn config_report(settings: &Settings) -> Value {
    let rpc_endpoints: Map<String, Value> = settings
        .rpc_endpoints
        .iter()
        .map(|(network, url)| (network.clone(), Value::String(rpc_host(url))))
        .collect();

    json!({
        "api_key_set": settings.api_key.is_some(),
        "private_key_set": settings.private_key.is_some(),
        "credential_set": settings.credential().is_some(),
        "wallet_password_set": settings.wallet_password.is_some(),
        "api_url": settings.railgun_api_url,
        "rpc_endpoints": rpc_endpoints,
    })
}

/// Every network the settings know about, with chain id, RPC host and contracts
pub fn networks_report(settings: &Settings) -> Value {
    let names: BTreeSet<&String> = settings
        .rpc_endpoints
        .keys()
        .chain(settings.chain_ids.keys())
        .chain(settings.railgun_contracts.keys())
        .collect();

    let networks: Map<String, Value> = names
        .into_iter()
        .map(|name| {
            let entry = json!({
                "builtin": Network::from_name(name).is_some(),
                "chain_id": settings.chain_id(name),
                "rpc_host": settings.rpc_url(name).map(rpc_host),
                "railgun_proxy": settings.railgun_proxy(name),
                "contracts": settings.railgun_contracts.get(name),
            });
            (name.clone(), entry)
        })
        .collect();

    Value::Object(networks)
}

pub async fn handle_get_gas_price(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: NetworkParams = parse_args(args)?;
    let response = ctx
        .api
        .get(&format!("/gas-price/{}", params.network), &[])
        .await?;

    Ok(json!({
        "network": params.network,
        "gas_price": field(&response, "gas_price")?,
        "base_fee": opt_field(&response, "base_fee"),
        "priority_fee": opt_field(&response, "priority_fee"),
    }))
}

pub async fn handle_get_supported_tokens(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: NetworkParams = parse_args(args)?;
    let response = ctx
        .api
        .get(&format!("/tokens/{}", params.network), &[])
        .await?;
    let tokens = array_field(&response, "tokens")?;

    Ok(json!({
        "network": params.network,
        "tokens": tokens,
        "count": tokens.len(),
    }))
}

pub async fn handle_verify_proof(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: VerifyProofParams = parse_args(args)?;
    let response = ctx
        .api
        .post("/proofs/verify", &json!({"proof_data": params.proof_data}))
        .await?;

    Ok(json!({
        "valid": field(&response, "valid")?,
        "proof_type": opt_field(&response, "proof_type"),
        "verified_at": opt_field(&response, "verified_at"),
    }))
}

pub async fn handle_check_config(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let _: NoParams = parse_args(args)?;
    Ok(json!({
        "config": config_report(&ctx.settings),
        "message": "Use environment variables or ~/.railgun/config.json to configure",
    }))
}
