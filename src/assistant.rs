//! Plain-English helpers built on top of the balance, gas and transaction endpoints.
//!
//! Each tool gathers a few backend reads, runs a small local computation
//! (affordability, privacy score, exit plan) and phrases the answer for a
//! non-technical user. The computations are plain functions so they can be
//! tested without a backend.

use once_cell::sync::Lazy;
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::amounts::{
    action_gas, format_units, parse_units, parse_wei, require_wei, token_decimals,
    value_to_wei, wei_to_eth, wei_to_gwei, ASSUMED_ETH_PRICE_USD, WEI_PER_GWEI,
};
use crate::context::{field, opt_field, parse_args, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::models::TransactionStatus;
use crate::schema::tool;
use crate::transactions::private_transfer_body;

/// Gas for unshielding one private token during an emergency exit
pub const EXIT_UNSHIELD_GAS: u64 = 180_000;
/// Gas for moving one public ERC-20 during an emergency exit
pub const EXIT_TRANSFER_GAS: u64 = 65_000;

/// Pending transactions priced below this are considered underpriced
pub const STUCK_GAS_PRICE_WEI: u128 = 20 * WEI_PER_GWEI;
/// Pending transactions older than this are considered stale
pub const STUCK_AGE_MINUTES: f64 = 30.0;

/// Totals below this many whole tokens are left out of summaries
const DUST_THRESHOLD: f64 = 0.01;

fn default_token() -> String {
    "USDC".to_string()
}

fn default_network() -> String {
    "ethereum".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AffordParams {
    /// Your wallet ID
    pub wallet_id: String,
    /// What you want to do (swap, shield, unshield, send, private_send)
    pub action: String,
    /// How much you want to use, in the token's smallest unit
    #[serde(default)]
    pub amount: Option<String>,
    /// Token symbol (default: USDC)
    #[serde(default = "default_token")]
    pub token: String,
    /// Network whose gas price is used (default: ethereum)
    #[serde(default = "default_network")]
    pub network: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExpensiveParams {
    /// What you're trying to do (shield, unshield, swap, ...)
    pub action: String,
    /// Which network you're on (default: ethereum)
    #[serde(default = "default_network")]
    pub network: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMoneyParams {
    /// Your wallet
    pub wallet_id: String,
    /// Who to send to
    pub to: String,
    /// How much, e.g. "10" or "10 USDC"
    pub amount: String,
    /// Token symbol (default: USDC). Overridden by a symbol inside `amount`.
    #[serde(default = "default_token")]
    pub token: String,
    /// Token contract address; the symbol is sent when omitted
    #[serde(default)]
    pub token_address: Option<String>,
    /// Keep the transfer inside the private pool (default: true)
    #[serde(default = "default_true")]
    pub keep_private: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WhereAreMyTokensParams {
    /// Your wallet
    pub wallet_id: String,
    /// Include raw per-token amounts (default: false)
    #[serde(default)]
    pub show_details: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StuckTransactionParams {
    /// Your wallet
    pub wallet_id: String,
    /// Specific transaction to diagnose; the newest pending one otherwise
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PrivacyParams {
    /// Your wallet
    pub wallet_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmergencyExitParams {
    /// Your wallet
    pub wallet_id: String,
    /// Where to send everything
    pub destination: String,
    /// Why you're exiting (default: general)
    #[serde(default = "default_reason")]
    pub reason: String,
    /// Network whose gas price is used (default: ethereum)
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_reason() -> String {
    "general".to_string()
}

pub fn get_assistant_tools() -> Vec<Tool> {
    vec![
        tool::<AffordParams>(
            "can_i_afford_this",
            "Check if you have enough tokens AND gas to do what you want. Example: \"Can I afford to swap 1000 USDC?\"",
        ),
        tool::<ExpensiveParams>(
            "why_is_this_so_expensive",
            "Explain in simple terms why a Railgun transaction costs what it does.",
        ),
        tool::<SendMoneyParams>(
            "just_send_money",
            "Send money the easiest way possible, shielding first when needed. Example: \"Just send 100 USDC to alice privately\"",
        ),
        tool::<WhereAreMyTokensParams>(
            "where_are_my_tokens",
            "Find all your tokens across public and private balances, in plain English.",
        ),
        tool::<StuckTransactionParams>(
            "fix_stuck_transaction",
            "Diagnose a stuck or pending transaction and suggest fixes.",
        ),
        tool::<PrivacyParams>(
            "optimize_my_privacy",
            "Score your privacy habits and give personalized tips.",
        ),
        tool::<EmergencyExitParams>(
            "emergency_exit",
            "Plan moving all funds out of Railgun in an emergency.",
        ),
    ]
}

/// Public and private balances of one wallet, keyed by token symbol, in base units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances {
    pub public: BTreeMap<String, u128>,
    pub private: BTreeMap<String, u128>,
}

impl Balances {
    pub fn from_response(response: &Value) -> ToolResult<Self> {
        let balances = field(response, "balances")?;
        Ok(Self {
            public: balance_side(&balances, "public")?,
            private: balance_side(&balances, "private")?,
        })
    }

    pub fn public_of(&self, token: &str) -> u128 {
        self.public.get(token).copied().unwrap_or(0)
    }

    pub fn private_of(&self, token: &str) -> u128 {
        self.private.get(token).copied().unwrap_or(0)
    }

    /// Every token held on either side
    pub fn tokens(&self) -> BTreeSet<&String> {
        self.public.keys().chain(self.private.keys()).collect()
    }
}

fn balance_side(balances: &Value, side: &str) -> ToolResult<BTreeMap<String, u128>> {
    let entries = match balances.get(side) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(ToolError::decode(format!(
                "{} balances are not an object: {}",
                side, other
            )))
        }
    };

    entries
        .iter()
        .map(|(token, amount)| {
            value_to_wei(amount)
                .map(|amount| (token.clone(), amount))
                .ok_or_else(|| {
                    ToolError::decode(format!("invalid {} balance for {}: {}", side, token, amount))
                })
        })
        .collect()
}

async fn fetch_balances(
    ctx: &ToolContext,
    wallet_id: &str,
    include_private: bool,
) -> ToolResult<Balances> {
    let mut query = vec![("wallet_id", wallet_id.to_string())];
    if include_private {
        query.push(("include_private", "true".to_string()));
    }
    let response = ctx.api.get("/balances", &query).await?;
    Balances::from_response(&response)
}

async fn fetch_gas_price(ctx: &ToolContext, network: &str) -> ToolResult<u128> {
    let response = ctx
        .api
        .get(&format!("/gas-price/{}", network), &[])
        .await?;
    require_wei(&field(&response, "gas_price")?, "gas_price")
}

/// Wei cost of `gas` units at `gas_price`
pub fn gas_cost_wei(gas: u64, gas_price: u128) -> ToolResult<u128> {
    u128::from(gas)
        .checked_mul(gas_price)
        .ok_or_else(|| ToolError::decode("gas_price out of range"))
}

/// Shortfalls preventing `amount` of `token` plus `gas_cost_wei` of ETH
pub fn affordability_issues(
    balances: &Balances,
    token: &str,
    amount: Option<u128>,
    gas_cost_wei: u128,
) -> Vec<String> {
    let mut issues = Vec::new();

    let public = balances.public_of(token);
    let private = balances.private_of(token);
    if let Some(amount) = amount {
        if amount > public.saturating_add(private) {
            issues.push(format!(
                "Not enough {}. You have {} public + {} private",
                token, public, private
            ));
        }
    }

    let eth = balances.public_of("ETH");
    if eth < gas_cost_wei {
        issues.push(format!(
            "Not enough ETH for gas. Need {:.4} ETH, have {:.4} ETH",
            wei_to_eth(gas_cost_wei),
            wei_to_eth(eth)
        ));
    }

    issues
}

pub async fn handle_can_i_afford_this(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: AffordParams = parse_args(args)?;
    let amount = params
        .amount
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(parse_wei)
        .transpose()?;

    let balances = fetch_balances(ctx, &params.wallet_id, false).await?;
    let gas_price = fetch_gas_price(ctx, &params.network).await?;

    let gas_cost = gas_cost_wei(action_gas(&params.action), gas_price)?;
    let issues = affordability_issues(&balances, &params.token, amount, gas_cost);
    let can_afford = issues.is_empty();

    Ok(json!({
        "can_afford": can_afford,
        "summary": if can_afford {
            "You're good to go!".to_string()
        } else {
            issues.join(" AND ")
        },
        "details": {
            "token_balance": balances.public_of(&params.token).to_string(),
            "private_balance": balances.private_of(&params.token).to_string(),
            "eth_balance": balances.public_of("ETH").to_string(),
            "estimated_gas_cost": gas_cost.to_string(),
            "gas_price_gwei": wei_to_gwei(gas_price),
        },
    }))
}

struct CostExplanation {
    reason: &'static str,
    tip: &'static str,
}

static EXPLANATIONS: Lazy<HashMap<&'static str, CostExplanation>> = Lazy::new(|| {
    HashMap::from([
        (
            "shield",
            CostExplanation {
                reason: "Shielding creates a zero-knowledge proof and adds your tokens to the private pool. It's like putting money in a safe that proves you own it without showing what's inside.",
                tip: "Shield larger amounts less frequently to save on gas",
            },
        ),
        (
            "unshield",
            CostExplanation {
                reason: "Unshielding removes tokens from the private pool while keeping your history private. It's like taking money out of the safe without revealing who you are.",
                tip: "Batch your unshields if possible",
            },
        ),
        (
            "swap",
            CostExplanation {
                reason: "A private swap unshields your tokens, swaps them and shields the result, all in one transaction.",
                tip: "Swap larger amounts to make the gas worthwhile",
            },
        ),
    ])
});

static GENERIC_EXPLANATION: CostExplanation = CostExplanation {
    reason: "Railgun uses advanced cryptography to keep your transactions private.",
    tip: "Private transactions cost more but protect your financial privacy",
};

pub async fn handle_why_is_this_so_expensive(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: ExpensiveParams = parse_args(args)?;
    let gas_price = fetch_gas_price(ctx, &params.network).await?;

    let action = params.action.to_ascii_lowercase();
    let explanation = EXPLANATIONS
        .get(action.as_str())
        .unwrap_or(&GENERIC_EXPLANATION);
    let gas_needed = action_gas(&action);
    let cost_usd = wei_to_eth(gas_cost_wei(gas_needed, gas_price)?) * ASSUMED_ETH_PRICE_USD;

    Ok(json!({
        "explanation": explanation.reason,
        "estimated_cost_usd": format!("${:.2}", cost_usd),
        "gas_needed": gas_needed,
        "current_gas_price": format!("{:.1} gwei", wei_to_gwei(gas_price)),
        "money_saving_tip": explanation.tip,
        "cheaper_times": "Usually late night US time or weekends",
    }))
}

/// Split `"10 USDC"` into amount and symbol; a bare amount keeps `default_token`
pub fn parse_human_amount(amount: &str, default_token: &str) -> ToolResult<(String, String)> {
    let parts: Vec<&str> = amount.split_whitespace().collect();
    match parts.as_slice() {
        [value] => Ok((value.to_string(), default_token.to_string())),
        [value, token] => Ok((value.to_string(), token.to_ascii_uppercase())),
        _ => Err(ToolError::invalid_params(format!(
            "Invalid amount: '{}'. Use a number, optionally followed by a token symbol",
            amount
        ))),
    }
}

fn short_address(to: &str) -> String {
    to.chars().take(8).collect()
}

pub async fn handle_just_send_money(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: SendMoneyParams = parse_args(args)?;
    let (amount, token) = parse_human_amount(&params.amount, &params.token)?;
    let decimals = token_decimals(&token);
    let amount_wei = parse_units(&amount, decimals)?;
    let token_ref = params
        .token_address
        .clone()
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| token.clone());

    let mut steps_taken = Vec::new();
    let mut tx_hash = Value::Null;

    if params.keep_private {
        let balances = fetch_balances(ctx, &params.wallet_id, false).await?;
        let private = balances.private_of(&token);

        if private < amount_wei {
            let shortfall = amount_wei - private;
            debug!(%shortfall, token = %token, "shielding before private send");
            ctx.api
                .post(
                    "/transactions/shield",
                    &json!({
                        "wallet_id": params.wallet_id,
                        "token_address": token_ref,
                        "amount": shortfall.to_string(),
                        "password": ctx.configured_password(),
                    }),
                )
                .await?;
            steps_taken.push(format!(
                "Shielded {} {}",
                format_units(shortfall, decimals),
                token
            ));
        }

        let body = private_transfer_body(
            ctx,
            &params.wallet_id,
            &token_ref,
            &amount_wei.to_string(),
            &params.to,
        );
        let response = ctx
            .api
            .post("/transactions/private-transfer", &body)
            .await?;
        tx_hash = opt_field(&response, "tx_hash");
        steps_taken.push(format!("Sent {} {} privately", amount, token));
    } else {
        steps_taken.push(format!(
            "Prepared a public send of {} {}; submit it from your public wallet",
            amount, token
        ));
    }

    let verb = if params.keep_private { "Sent" } else { "Prepared" };
    Ok(json!({
        "message": format!("{} {} {} to {}...", verb, amount, token, short_address(&params.to)),
        "submitted": params.keep_private,
        "steps_taken": steps_taken,
        "tx_hash": tx_hash,
        "privacy_level": if params.keep_private { "Fully Private" } else { "Public" },
        "estimated_time": "2-5 minutes",
    }))
}

/// One line per token worth mentioning, e.g. `"1.50 USDC (all private)"`
pub fn token_summary(balances: &Balances) -> Vec<String> {
    balances
        .tokens()
        .into_iter()
        .filter_map(|token| {
            let decimals = token_decimals(token);
            let public = format_units(balances.public_of(token), decimals);
            let private = format_units(balances.private_of(token), decimals);
            let total = public + private;

            if total <= DUST_THRESHOLD {
                return None;
            }
            Some(if public > 0.0 && private > 0.0 {
                format!(
                    "{:.2} {} ({:.2} public + {:.2} private)",
                    total, token, public, private
                )
            } else if private > 0.0 {
                format!("{:.2} {} (all private)", private, token)
            } else {
                format!("{:.2} {} (all public)", public, token)
            })
        })
        .collect()
}

pub async fn handle_where_are_my_tokens(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: WhereAreMyTokensParams = parse_args(args)?;
    let balances = fetch_balances(ctx, &params.wallet_id, true).await?;

    let mut summary = token_summary(&balances);
    if summary.is_empty() {
        summary.push("No tokens found".to_string());
    }
    let has_public = balances.public.values().any(|amount| *amount > 0);

    let mut result = json!({
        "summary": summary,
        "total_tokens": balances.tokens().len(),
        "advice": if has_public {
            "Shield tokens to make them private"
        } else {
            "Your tokens are private!"
        },
    });

    if params.show_details {
        let details: serde_json::Map<String, Value> = balances
            .tokens()
            .into_iter()
            .map(|token| {
                (
                    token.clone(),
                    json!({
                        "public": balances.public_of(token).to_string(),
                        "private": balances.private_of(token).to_string(),
                        "decimals": token_decimals(token),
                    }),
                )
            })
            .collect();
        result["details"] = Value::Object(details);
    }

    Ok(result)
}

/// Reasons a pending transaction may be stuck
pub fn diagnose_stuck(transaction: &Value) -> Vec<String> {
    let mut solutions = Vec::new();

    let gas_price = transaction
        .get("gas_price")
        .and_then(value_to_wei)
        .unwrap_or(0);
    if gas_price < STUCK_GAS_PRICE_WEI {
        solutions.push("Gas price too low. Need to speed up with higher gas.".to_string());
    }

    if age_minutes(transaction) > STUCK_AGE_MINUTES {
        solutions.push("Transaction is old. May need to cancel and retry.".to_string());
    }

    solutions
}

fn age_minutes(transaction: &Value) -> f64 {
    transaction
        .get("age_minutes")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

pub async fn handle_fix_stuck_transaction(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: StuckTransactionParams = parse_args(args)?;

    let transaction = match params.transaction_id.filter(|id| !id.is_empty()) {
        Some(id) => {
            let response = ctx
                .api
                .get(&format!("/transactions/{}", id), &[])
                .await?;
            field(&response, "transaction")?
        }
        None => {
            let response = ctx
                .api
                .get(
                    "/transactions",
                    &[
                        ("wallet_id", params.wallet_id.clone()),
                        ("limit", "10".to_string()),
                        ("status", TransactionStatus::Pending.as_str().to_string()),
                    ],
                )
                .await?;
            let pending = field(&response, "transactions")?;
            match pending.as_array().and_then(|txs| txs.first()) {
                Some(first) => first.clone(),
                None => {
                    return Ok(json!({
                        "message": "No stuck transactions found! You're all good",
                    }))
                }
            }
        }
    };

    let gas_price = transaction
        .get("gas_price")
        .and_then(value_to_wei)
        .unwrap_or(0);

    Ok(json!({
        "stuck_transaction": {
            "id": opt_field(&transaction, "id"),
            "type": opt_field(&transaction, "type"),
            "age": format!("{} minutes", age_minutes(&transaction)),
            "gas_price": format!("{} gwei", wei_to_gwei(gas_price)),
        },
        "solutions": diagnose_stuck(&transaction),
        "quick_fix": "Try cancelling and resending with 50% higher gas price",
        "prevent_future": "Always check gas prices before sending",
    }))
}

/// Privacy score out of 100 and the tips explaining each deduction
pub fn privacy_score(balances: &Balances, transactions: &[Value]) -> (u32, Vec<String>) {
    let mut score = 100u32;
    let mut tips = Vec::new();

    let public = balances.public.values().fold(0u128, |acc, v| acc.saturating_add(*v));
    let private = balances.private.values().fold(0u128, |acc, v| acc.saturating_add(*v));
    if public > private {
        tips.push("Most of your funds are public! Shield them for privacy.".to_string());
        score -= 30;
    }

    let recipients: BTreeSet<String> = transactions
        .iter()
        .map(|tx| opt_field(tx, "to_address").to_string())
        .collect();
    if recipients.len() < 3 {
        tips.push("You're sending to the same addresses repeatedly. Mix it up!".to_string());
        score -= 20;
    }

    let hours: BTreeSet<u64> = transactions
        .iter()
        .map(|tx| tx.get("hour").and_then(Value::as_u64).unwrap_or(0))
        .collect();
    if hours.len() < 5 {
        tips.push("You transact at similar times. Vary your schedule.".to_string());
        score -= 10;
    }

    if tips.is_empty() {
        tips.push("Great job! Your privacy practices are solid!".to_string());
    }

    (score, tips)
}

pub async fn handle_optimize_my_privacy(
    ctx: &ToolContext,
    args: Option<&JsonObject>,
) -> ToolResult {
    let params: PrivacyParams = parse_args(args)?;

    let balances = fetch_balances(ctx, &params.wallet_id, false).await?;
    let history = ctx
        .api
        .get(
            "/transactions",
            &[
                ("wallet_id", params.wallet_id.clone()),
                ("limit", "50".to_string()),
            ],
        )
        .await?;
    let transactions = field(&history, "transactions")?;
    let transactions = transactions.as_array().map(Vec::as_slice).unwrap_or(&[]);

    let (score, tips) = privacy_score(&balances, transactions);

    Ok(json!({
        "privacy_score": format!("{}/100", score),
        "tips": tips,
        "next_steps": [
            "Shield remaining public tokens",
            "Use multiple wallets for different purposes",
            "Add delays between related transactions",
            "Use relayers for maximum privacy",
        ],
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitAction {
    Unshield,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitStep {
    pub token: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub action: ExitAction,
    pub gas_estimate: u64,
}

/// Unshield every private balance, then move every public token except ETH
pub fn exit_plan(balances: &Balances) -> Vec<ExitStep> {
    let unshields = balances
        .private
        .iter()
        .filter(|(_, amount)| **amount > 0)
        .map(|(token, amount)| ExitStep {
            token: token.clone(),
            amount: amount.to_string(),
            action: ExitAction::Unshield,
            gas_estimate: EXIT_UNSHIELD_GAS,
        });

    let transfers = balances
        .public
        .iter()
        .filter(|(token, amount)| **amount > 0 && token.as_str() != "ETH")
        .map(|(token, amount)| ExitStep {
            token: token.clone(),
            amount: amount.to_string(),
            action: ExitAction::Transfer,
            gas_estimate: EXIT_TRANSFER_GAS,
        });

    unshields.chain(transfers).collect()
}

pub async fn handle_emergency_exit(ctx: &ToolContext, args: Option<&JsonObject>) -> ToolResult {
    let params: EmergencyExitParams = parse_args(args)?;

    let balances = fetch_balances(ctx, &params.wallet_id, true).await?;
    let steps = exit_plan(&balances);
    let total_gas: u64 = steps.iter().map(|s| s.gas_estimate).sum();

    let gas_price = fetch_gas_price(ctx, &params.network).await?;
    let total_cost = wei_to_eth(gas_cost_wei(total_gas, gas_price)?);

    Ok(json!({
        "exit_plan": {
            "steps": steps.len(),
            "tokens_to_move": steps.iter().map(|s| s.token.as_str()).collect::<Vec<_>>(),
            "actions": steps,
            "total_gas": total_gas,
            "estimated_time": format!("{} minutes", steps.len() * 2),
            "estimated_cost": format!("{:.4} ETH", total_cost),
            "destination": params.destination,
            "reason": params.reason,
        },
        "warning": "This will move ALL funds and reduce privacy!",
        "execute_command": "Run unshield_tokens for each unshield step, then send the public tokens to the destination",
    }))
}
