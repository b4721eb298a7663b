//! Shield, unshield and private transfer tools

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::{field, insert_opt, opt_field, parse_args, ToolContext};
use crate::error::ToolResult;
use crate::schema::tool;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ShieldParams {
    /// ID of the wallet
    pub wallet_id: String,
    /// Token to shield (use 0x0 for the native token)
    pub token_address: String,
    /// Amount to shield in wei
    pub amount: String,
    /// Recipient 0zk address (defaults to the sender's 0zk address)
    #[serde(default)]
    pub recipient_0zk_address: Option<String>,
    /// Gas price in wei
    #[serde(default)]
    pub gas_price: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UnshieldParams {
    /// ID of the wallet
    pub wallet_id: String,
    /// Token to unshield
    pub token_address: String,
    /// Amount to unshield in wei
    pub amount: String,
    /// Recipient public address (defaults to the sender's 0x address)
    #[serde(default)]
    pub recipient_0x_address: Option<String>,
    /// Gas price in wei
    #[serde(default)]
    pub gas_price: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PrivateTransferParams {
    /// ID of the sending wallet
    pub wallet_id: String,
    /// Token to transfer
    pub token_address: String,
    /// Amount to transfer in wei
    pub amount: String,
    /// Recipient's 0zk address
    pub recipient_0zk_address: String,
    /// Gas price in wei
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Encrypted memo for the recipient
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransactionStatusParams {
    /// ID of the transaction
    pub transaction_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransactionHistoryParams {
    /// ID of the wallet
    pub wallet_id: String,
    /// Maximum number of transactions to return (default: 50)
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of transactions to skip (default: 0)
    #[serde(default)]
    pub offset: u32,
    /// Filter by type (shield, unshield, private_transfer)
    #[serde(default)]
    pub transaction_type: Option<String>,
}

fn default_limit() -> u32 {
    50
}

pub fn get_transaction_tools() -> Vec<Tool> {
    vec![
        tool::<ShieldParams>(
            "shield_tokens",
            "Shield tokens from the public balance into the private balance.",
        ),
        tool::<UnshieldParams>(
            "unshield_tokens",
            "Unshield tokens from the private balance to the public balance.",
        ),
        tool::<PrivateTransferParams>(
            "private_transfer",
            "Transfer tokens privately between 0zk addresses.",
        ),
        tool::<TransactionStatusParams>(
            "get_transaction_status",
            "Get the status of a transaction.",
        ),
        tool::<TransactionHistoryParams>(
            "get_transaction_history",
            "Get transaction history for a wallet.",
        ),
    ]
}

/// Fields reported for any submitted transaction
fn submitted(response: &Value, message: &str) -> ToolResult {
    Ok(json!({
        "transaction_id": field(response, "transaction_id")?,
        "tx_hash": field(response, "tx_hash")?,
        "status": field(response, "status")?,
        "gas_used": opt_field(response, "gas_used"),
        "message": message,
    }))
}

/// Body for `/transactions/private-transfer`, shared with the multi-step tools
pub(crate) fn private_transfer_body(
    ctx: &ToolContext,
    wallet_id: &str,
    token_address: &str,
    amount: &str,
    recipient_0zk_address: &str,
) -> Value {
    json!({
        "wallet_id": wallet_id,
        "token_address": token_address,
        "amount": amount,
        "recipient_0zk_address": recipient_0zk_address,
        "password": ctx.configured_password(),
    })
}

pub async fn handle_shield_tokens(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: ShieldParams = parse_args(args)?;

    let mut body = json!({
        "wallet_id": params.wallet_id,
        "token_address": params.token_address,
        "amount": params.amount,
        "password": ctx.configured_password(),
    });
    insert_opt(&mut body, "recipient_0zk_address", params.recipient_0zk_address);
    insert_opt(&mut body, "gas_price", params.gas_price);

    let response = ctx.api.post("/transactions/shield", &body).await?;
    submitted(&response, "Shield transaction submitted successfully")
}

pub async fn handle_unshield_tokens(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: UnshieldParams = parse_args(args)?;

    let mut body = json!({
        "wallet_id": params.wallet_id,
        "token_address": params.token_address,
        "amount": params.amount,
        "password": ctx.configured_password(),
    });
    insert_opt(&mut body, "recipient_0x_address", params.recipient_0x_address);
    insert_opt(&mut body, "gas_price", params.gas_price);

    let response = ctx.api.post("/transactions/unshield", &body).await?;
    submitted(&response, "Unshield transaction submitted successfully")
}

pub async fn handle_private_transfer(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: PrivateTransferParams = parse_args(args)?;

    let mut body = private_transfer_body(
        ctx,
        &params.wallet_id,
        &params.token_address,
        &params.amount,
        &params.recipient_0zk_address,
    );
    insert_opt(&mut body, "gas_price", params.gas_price);
    insert_opt(&mut body, "memo", params.memo);

    let response = ctx
        .api
        .post("/transactions/private-transfer", &body)
        .await?;
    submitted(&response, "Private transfer submitted successfully")
}

pub async fn handle_get_transaction_status(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: TransactionStatusParams = parse_args(args)?;
    let response = ctx
        .api
        .get(&format!("/transactions/{}", params.transaction_id), &[])
        .await?;

    Ok(json!({"transaction": field(&response, "transaction")?}))
}

pub async fn handle_get_transaction_history(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: TransactionHistoryParams = parse_args(args)?;

    let mut query = vec![
        ("wallet_id", params.wallet_id),
        ("limit", params.limit.to_string()),
        ("offset", params.offset.to_string()),
    ];
    if let Some(kind) = params.transaction_type.filter(|t| !t.is_empty()) {
        query.push(("type", kind));
    }

    let response = ctx.api.get("/transactions", &query).await?;

    Ok(json!({
        "transactions": field(&response, "transactions")?,
        "total": field(&response, "total")?,
        "limit": params.limit,
        "offset": params.offset,
    }))
}
