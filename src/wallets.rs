//! Wallet management and balance tools

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::{array_field, field, opt_field, parse_args, ToolContext};
use crate::error::ToolResult;
use crate::schema::{tool, NoParams};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWalletParams {
    /// Network to create the wallet on (ethereum, arbitrum, polygon, bsc)
    pub network: String,
    /// Password to encrypt the wallet (defaults to the configured wallet password)
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportWalletParams {
    /// Private key to import
    pub private_key: String,
    /// Network for the wallet
    pub network: String,
    /// Password to encrypt the imported wallet (defaults to the configured wallet password)
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetBalanceParams {
    /// ID of the wallet
    pub wallet_id: String,
    /// Only report this token
    #[serde(default)]
    pub token_address: Option<String>,
    /// Whether to include private (0zk) balances (default: true)
    #[serde(default = "default_true")]
    pub include_private: bool,
}

fn default_true() -> bool {
    true
}

pub fn get_wallet_tools() -> Vec<Tool> {
    vec![
        tool::<CreateWalletParams>(
            "create_wallet",
            "Create a new Railgun wallet with both 0x (public) and 0zk (private) addresses.",
        ),
        tool::<ImportWalletParams>(
            "import_wallet",
            "Import an existing wallet using its private key.",
        ),
        tool::<NoParams>(
            "list_wallets",
            "List all wallets associated with the configured API key.",
        ),
        tool::<GetBalanceParams>(
            "get_balance",
            "Get wallet balances for both public (0x) and private (0zk) addresses.",
        ),
    ]
}

/// Map a wallet creation response onto the fields we report
pub(crate) fn wallet_summary(response: &Value) -> ToolResult<Value> {
    Ok(json!({
        "wallet_id": field(response, "wallet_id")?,
        "address_0x": field(response, "address_0x")?,
        "address_0zk": field(response, "address_0zk")?,
    }))
}

fn merge(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

pub async fn handle_create_wallet(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: CreateWalletParams = parse_args(args)?;
    let password = ctx.wallet_password(params.password)?;

    let response = ctx
        .api
        .post(
            "/wallets/create",
            &json!({"network": params.network, "password": password}),
        )
        .await?;

    Ok(merge(
        wallet_summary(&response)?,
        json!({
            "network": params.network,
            "message": "Wallet created successfully. Your wallet is encrypted with the provided password.",
        }),
    ))
}

pub async fn handle_import_wallet(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: ImportWalletParams = parse_args(args)?;
    let password = ctx.wallet_password(params.password)?;

    let response = ctx
        .api
        .post(
            "/wallets/import",
            &json!({
                "private_key": params.private_key,
                "network": params.network,
                "password": password,
            }),
        )
        .await?;

    Ok(merge(
        wallet_summary(&response)?,
        json!({"network": params.network}),
    ))
}

pub async fn handle_list_wallets(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let _: NoParams = parse_args(args)?;
    let response = ctx.api.get("/wallets", &[]).await?;
    let wallets = array_field(&response, "wallets")?;

    Ok(json!({
        "wallets": wallets,
        "count": wallets.len(),
    }))
}

pub async fn handle_get_balance(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: GetBalanceParams = parse_args(args)?;

    let mut query = vec![
        ("wallet_id", params.wallet_id.clone()),
        ("include_private", params.include_private.to_string()),
    ];
    if let Some(token) = params.token_address.filter(|t| !t.is_empty()) {
        query.push(("token_address", token));
    }

    let response = ctx.api.get("/balances", &query).await?;

    Ok(json!({
        "wallet_id": params.wallet_id,
        "balances": field(&response, "balances")?,
        "total_value_usd": opt_field(&response, "total_value_usd"),
    }))
}
