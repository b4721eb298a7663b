//! Tools that operate across several wallets at once.
//!
//! Every multi-step tool runs its backend calls in order and stops at the
//! first failure. Work already submitted is not rolled back.

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::amounts::{parse_wei, split_equal};
use crate::context::{field, opt_field, parse_args, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::schema::tool;
use crate::transactions::private_transfer_body;
use crate::wallets::wallet_summary;

/// Upper bound on wallets created by a single batch call
pub const MAX_BATCH_WALLETS: u32 = 10;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWalletBatchParams {
    /// Number of wallets to create (max 10)
    pub count: u32,
    /// Network for all wallets
    pub network: String,
    /// Base password, or prefix for unique passwords
    pub password_prefix: String,
    /// Derive a distinct password per wallet as `{prefix}_{index}` (default: true)
    #[serde(default = "default_true")]
    pub use_unique_passwords: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    #[default]
    Equal,
    Custom,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DistributeTokensParams {
    /// Wallet the tokens are sent from
    pub source_wallet_id: String,
    /// Token to distribute
    pub token_address: String,
    /// Total amount to distribute in wei
    pub total_amount: String,
    /// Wallets receiving the tokens
    pub destination_wallet_ids: Vec<String>,
    /// "equal" splits the total evenly, "custom" uses `amounts` (default: equal)
    #[serde(default)]
    pub distribution_type: DistributionType,
    /// Per-wallet amounts in wei, required for custom distribution
    #[serde(default)]
    pub amounts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MixTokensParams {
    /// Wallets to mix between
    pub wallet_ids: Vec<String>,
    /// Token to mix
    pub token_address: String,
    /// Number of mixing rounds (default: 3)
    #[serde(default = "default_rounds")]
    pub mixing_rounds: u32,
    /// Delay between transactions in seconds (default: 30)
    #[serde(default = "default_delay")]
    pub delay_seconds: u64,
}

fn default_rounds() -> u32 {
    3
}

fn default_delay() -> u64 {
    30
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WalletAnalyticsParams {
    /// Wallets to analyze
    pub wallet_ids: Vec<String>,
    /// Include the ten most recent transactions per wallet (default: true)
    #[serde(default = "default_true")]
    pub include_transactions: bool,
}

pub fn get_multi_wallet_tools() -> Vec<Tool> {
    vec![
        tool::<CreateWalletBatchParams>(
            "create_wallet_batch",
            "Create multiple wallets at once for enhanced privacy.",
        ),
        tool::<DistributeTokensParams>(
            "distribute_tokens",
            "Distribute tokens from one wallet to multiple wallets privately.",
        ),
        tool::<MixTokensParams>(
            "mix_tokens",
            "Plan mixing tokens between multiple wallets for enhanced privacy.",
        ),
        tool::<WalletAnalyticsParams>(
            "get_wallet_analytics",
            "Get balance and activity analytics across multiple wallets.",
        ),
    ]
}

fn batch_password(prefix: &str, index: u32, unique: bool) -> String {
    if unique {
        format!("{}_{}", prefix, index)
    } else {
        prefix.to_string()
    }
}

/// Per-destination wei amounts for a distribution request
pub fn distribution_amounts(params: &DistributeTokensParams) -> ToolResult<Vec<String>> {
    let destinations = params.destination_wallet_ids.len();
    match params.distribution_type {
        DistributionType::Equal => {
            let total = parse_wei(&params.total_amount)?;
            Ok(split_equal(total, destinations)?
                .into_iter()
                .map(|share| share.to_string())
                .collect())
        }
        DistributionType::Custom => {
            let amounts = params
                .amounts
                .as_ref()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    ToolError::invalid_params("Custom amounts required for custom distribution")
                })?;
            if amounts.len() != destinations {
                return Err(ToolError::invalid_params(format!(
                    "Expected {} custom amounts, got {}",
                    destinations,
                    amounts.len()
                )));
            }
            for amount in amounts {
                parse_wei(amount)?;
            }
            Ok(amounts.clone())
        }
    }
}

pub async fn handle_create_wallet_batch(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: CreateWalletBatchParams = parse_args(args)?;
    if params.count > MAX_BATCH_WALLETS {
        return Err(ToolError::invalid_params("Maximum 10 wallets per batch"));
    }

    let mut wallets_created = Vec::with_capacity(params.count as usize);
    for index in 0..params.count {
        let password = batch_password(
            &params.password_prefix,
            index,
            params.use_unique_passwords,
        );
        let response = ctx
            .api
            .post(
                "/wallets/create",
                &json!({"network": params.network, "password": password}),
            )
            .await?;

        let mut wallet = wallet_summary(&response)?;
        wallet["index"] = json!(index);
        debug!(index, "created batch wallet");
        wallets_created.push(wallet);
    }

    info!(count = params.count, network = %params.network, "wallet batch created");
    Ok(json!({
        "wallets_created": wallets_created,
        "count": wallets_created.len(),
        "network": params.network,
        "message": format!("Created {} wallets successfully", params.count),
    }))
}

pub async fn handle_distribute_tokens(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: DistributeTokensParams = parse_args(args)?;
    let amounts = distribution_amounts(&params)?;

    let mut destinations = Vec::with_capacity(params.destination_wallet_ids.len());
    for wallet_id in &params.destination_wallet_ids {
        let wallet = ctx.api.get(&format!("/wallets/{}", wallet_id), &[]).await?;
        let address = field(&wallet, "address_0zk")?;
        let address = address
            .as_str()
            .ok_or_else(|| ToolError::decode("address_0zk is not a string"))?
            .to_string();
        destinations.push((wallet_id, address));
    }

    let mut transfers = Vec::with_capacity(destinations.len());
    for ((wallet_id, address), amount) in destinations.iter().zip(&amounts) {
        let body = private_transfer_body(
            ctx,
            &params.source_wallet_id,
            &params.token_address,
            amount,
            address,
        );
        let response = ctx
            .api
            .post("/transactions/private-transfer", &body)
            .await?;

        transfers.push(json!({
            "to_wallet": wallet_id,
            "amount": amount,
            "tx_hash": field(&response, "tx_hash")?,
            "status": field(&response, "status")?,
        }));
    }

    Ok(json!({
        "source_wallet": params.source_wallet_id,
        "transfers": transfers,
        "total_distributed": params.total_amount,
        "message": format!("Distributed tokens to {} wallets", transfers.len()),
    }))
}

pub async fn handle_mix_tokens(_ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: MixTokensParams = parse_args(args)?;
    let wallets = params.wallet_ids.len() as u64;
    let estimated_time = u64::from(params.mixing_rounds) * params.delay_seconds * wallets;

    Ok(json!({
        "message": "Token mixing initiated",
        "wallets": wallets,
        "rounds": params.mixing_rounds,
        "estimated_time": estimated_time,
    }))
}

pub async fn handle_get_wallet_analytics(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: WalletAnalyticsParams = parse_args(args)?;

    let mut wallets = Vec::with_capacity(params.wallet_ids.len());
    let mut total_value_usd = 0f64;

    for wallet_id in &params.wallet_ids {
        let balances = ctx
            .api
            .get(
                "/balances",
                &[
                    ("wallet_id", wallet_id.clone()),
                    ("include_private", "true".to_string()),
                ],
            )
            .await?;

        let value_usd = usd_value(&opt_field(&balances, "total_value_usd"));
        let mut wallet = json!({
            "wallet_id": wallet_id,
            "balances": field(&balances, "balances")?,
            "total_value_usd": value_usd,
        });

        if params.include_transactions {
            let history = ctx
                .api
                .get(
                    "/transactions",
                    &[("wallet_id", wallet_id.clone()), ("limit", "10".to_string())],
                )
                .await?;
            wallet["recent_transactions"] = field(&history, "transactions")?;
            wallet["total_transactions"] = field(&history, "total")?;
        }

        total_value_usd += value_usd;
        wallets.push(wallet);
    }

    Ok(json!({
        "analytics": {
            "total_wallets": params.wallet_ids.len(),
            "wallets": wallets,
            "aggregate": {
                "total_value_usd": total_value_usd,
                "tokens": {},
            },
        }
    }))
}

/// USD value the API may report as a number or numeric string; absent is zero
fn usd_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
