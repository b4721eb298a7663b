//! Data shapes exchanged with the Railgun API

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Networks with built-in Railgun defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Arbitrum,
    Polygon,
    Bsc,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Ethereum,
        Network::Arbitrum,
        Network::Polygon,
        Network::Bsc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Polygon => "polygon",
            Network::Bsc => "bsc",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42161,
            Network::Polygon => 137,
            Network::Bsc => 56,
        }
    }

    /// Environment variable overriding this network's RPC URL
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETHEREUM_RPC_URL",
            Network::Arbitrum => "ARBITRUM_RPC_URL",
            Network::Polygon => "POLYGON_RPC_URL",
            Network::Bsc => "BSC_RPC_URL",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Ethereum => "https://eth-mainnet.g.alchemy.com/v2/your-api-key",
            Network::Arbitrum => "https://arb-mainnet.g.alchemy.com/v2/your-api-key",
            Network::Polygon => "https://polygon-mainnet.g.alchemy.com/v2/your-api-key",
            Network::Bsc => "https://bsc-dataseed.binance.org/",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|n| n.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Erc20,
    Erc721,
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Approve,
    Swap,
    Transfer,
    Shield,
    Unshield,
    AddLiquidity,
    RemoveLiquidity,
    Stake,
    Unstake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "type")]
    pub kind: TokenType,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenAmount {
    pub token: Token,
    /// Wei amount as a decimal string
    pub amount: String,
}

/// A single DeFi action inside a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Step {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<TokenAmount>,
    #[serde(default)]
    pub outputs: Vec<TokenAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_args: Option<BTreeMap<String, serde_json::Value>>,
}

/// A named, ordered sequence of steps executed as one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub network: Network,
    pub created_at: String,
}
