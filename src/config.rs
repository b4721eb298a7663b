//! Configuration management for the Railgun MCP server
//!
//! Settings are resolved once at startup. Each value comes from the first
//! source that provides it: environment variable, then `~/.railgun/config.json`,
//! then the built-in default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::Network;

pub const DEFAULT_API_URL: &str = "https://api.railgun.org/v1";

pub const ENV_API_KEY: &str = "RAILGUN_API_KEY";
pub const ENV_PRIVATE_KEY: &str = "RAILGUN_PRIVATE_KEY";
pub const ENV_WALLET_PASSWORD: &str = "RAILGUN_WALLET_PASSWORD";
pub const ENV_API_URL: &str = "RAILGUN_API_URL";

const POSEIDON: &str = "0x3e3a3D69dc66bA10737F531ed088954a9EC89d97";
const VERIFIER: &str = "0x87C7fd0635Fb4E2FE5A3b40d5a57E96cE01a0B7a";

/// Railgun contract addresses on one network.
///
/// Fields are optional so a config file can override a single address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poseidon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
}

impl ContractAddresses {
    fn new(proxy: &str) -> Self {
        Self {
            proxy: Some(proxy.to_string()),
            poseidon: Some(POSEIDON.to_string()),
            verifier: Some(VERIFIER.to_string()),
        }
    }

    /// Overlay the addresses present in `other`
    fn merge(&mut self, other: ContractAddresses) {
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.poseidon.is_some() {
            self.poseidon = other.poseidon;
        }
        if other.verifier.is_some() {
            self.verifier = other.verifier;
        }
    }
}

/// Mainnet deployments. Arbitrum has no built-in entry.
fn default_contracts() -> BTreeMap<String, ContractAddresses> {
    [
        (
            Network::Ethereum,
            "0xFA7093CDD9EE6932B4eb2c9e1cde7CE00B1FA4b9",
        ),
        (
            Network::Polygon,
            "0x19b620929f97b7b990801496c3b361ca5def8c71",
        ),
        (Network::Bsc, "0x590162bf4b50f6576a459b75309ee21d92178a10"),
    ]
    .into_iter()
    .map(|(network, proxy)| (network.name().to_string(), ContractAddresses::new(proxy)))
    .collect()
}

/// Shape of `~/.railgun/config.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    wallet_password: Option<String>,
    #[serde(default)]
    railgun_api_url: Option<String>,
    #[serde(default)]
    rpc_endpoints: BTreeMap<String, String>,
    #[serde(default)]
    railgun_contracts: BTreeMap<String, ContractAddresses>,
    #[serde(default)]
    chain_ids: BTreeMap<String, u64>,
}

impl ConfigFile {
    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub private_key: Option<String>,
    pub wallet_password: Option<String>,
    pub railgun_api_url: String,
    pub rpc_endpoints: BTreeMap<String, String>,
    pub railgun_contracts: BTreeMap<String, ContractAddresses>,
    pub chain_ids: BTreeMap<String, u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            private_key: None,
            wallet_password: None,
            railgun_api_url: DEFAULT_API_URL.to_string(),
            rpc_endpoints: Network::ALL
                .iter()
                .map(|n| (n.name().to_string(), n.default_rpc_url().to_string()))
                .collect(),
            railgun_contracts: default_contracts(),
            chain_ids: Network::ALL
                .iter()
                .map(|n| (n.name().to_string(), n.chain_id()))
                .collect(),
        }
    }
}

/// `~/.railgun/config.json`, if a home directory can be determined
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".railgun").join("config.json"))
}

impl Settings {
    /// Load settings from the process environment and the config file.
    ///
    /// `path_override` replaces the default `~/.railgun/config.json` location.
    pub fn load(path_override: Option<PathBuf>) -> Self {
        let path = path_override.or_else(default_config_path);
        Self::load_with(|key| std::env::var(key).ok(), path.as_deref())
    }

    /// Resolve settings from an arbitrary environment lookup and config path.
    ///
    /// Never fails: an unreadable or malformed file is logged and ignored.
    pub fn load_with<F>(env: F, path: Option<&Path>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.is_empty());
        let file = path.map(Self::read_file).unwrap_or_default();

        let mut settings = Self::default();

        settings.api_key = lookup(ENV_API_KEY).or(file.api_key);
        settings.private_key = lookup(ENV_PRIVATE_KEY).or(file.private_key);
        settings.wallet_password = lookup(ENV_WALLET_PASSWORD).or(file.wallet_password);
        if let Some(url) = lookup(ENV_API_URL).or(file.railgun_api_url) {
            settings.railgun_api_url = url;
        }

        settings.rpc_endpoints.extend(file.rpc_endpoints);
        for network in Network::ALL {
            if let Some(url) = lookup(network.rpc_env_var()) {
                settings.rpc_endpoints.insert(network.name().to_string(), url);
            }
        }

        for (network, overrides) in file.railgun_contracts {
            settings
                .railgun_contracts
                .entry(network)
                .or_default()
                .merge(overrides);
        }

        settings.chain_ids.extend(file.chain_ids);

        settings
    }

    fn read_file(path: &Path) -> ConfigFile {
        if !path.exists() {
            debug!(path = %path.display(), "No config file found, using environment and defaults");
            return ConfigFile::default();
        }

        match ConfigFile::read(path) {
            Ok(file) => {
                info!(path = %path.display(), "Loaded config file");
                file
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config file");
                ConfigFile::default()
            }
        }
    }

    /// Credential sent as the bearer token: the API key, else the private key
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().or(self.private_key.as_deref())
    }

    pub fn rpc_url(&self, network: &str) -> Option<&str> {
        self.rpc_endpoints.get(network).map(String::as_str)
    }

    /// Chain ID for a network, defaulting to mainnet (1) when unknown
    pub fn chain_id(&self, network: &str) -> u64 {
        self.chain_ids.get(network).copied().unwrap_or(1)
    }

    pub fn railgun_proxy(&self, network: &str) -> Option<&str> {
        self.railgun_contracts
            .get(network)
            .and_then(|c| c.proxy.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_env_or_file() {
        let settings = Settings::load_with(env_from(&[]), None);

        assert!(settings.api_key.is_none());
        assert!(settings.wallet_password.is_none());
        assert_eq!(settings.railgun_api_url, DEFAULT_API_URL);
        for network in Network::ALL {
            assert_eq!(
                settings.rpc_url(network.name()),
                Some(network.default_rpc_url())
            );
        }
        assert!(settings.credential().is_none());
    }

    #[test]
    fn test_api_key_from_env_only() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("config.json");

        let settings = Settings::load_with(env_from(&[(ENV_API_KEY, "abc")]), Some(&missing));

        assert_eq!(settings.api_key.as_deref(), Some("abc"));
        assert_eq!(settings.railgun_api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_values_from_env() {
        let settings = Settings::load_with(
            env_from(&[
                (ENV_API_KEY, "test-api-key"),
                (ENV_WALLET_PASSWORD, "test-password"),
                (ENV_API_URL, "https://test-api.railgun.org/v1"),
                ("ETHEREUM_RPC_URL", "https://test-eth-rpc.com"),
            ]),
            None,
        );

        assert_eq!(settings.api_key.as_deref(), Some("test-api-key"));
        assert_eq!(settings.wallet_password.as_deref(), Some("test-password"));
        assert_eq!(settings.railgun_api_url, "https://test-api.railgun.org/v1");
        assert_eq!(
            settings.rpc_url("ethereum"),
            Some("https://test-eth-rpc.com")
        );
    }

    #[test]
    fn test_values_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "api_key": "file-api-key",
                "wallet_password": "file-password",
                "railgun_api_url": "https://file-api.railgun.org/v1",
                "rpc_endpoints": {"ethereum": "https://file-eth-rpc.com"}
            }"#,
        );

        let settings = Settings::load_with(env_from(&[]), Some(&path));

        assert_eq!(settings.api_key.as_deref(), Some("file-api-key"));
        assert_eq!(settings.wallet_password.as_deref(), Some("file-password"));
        assert_eq!(settings.railgun_api_url, "https://file-api.railgun.org/v1");
        assert_eq!(
            settings.rpc_url("ethereum"),
            Some("https://file-eth-rpc.com")
        );
        // Networks the file does not mention keep their defaults
        assert_eq!(
            settings.rpc_url("bsc"),
            Some(Network::Bsc.default_rpc_url())
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "api_key": "file-api-key",
                "wallet_password": "file-password",
                "rpc_endpoints": {"polygon": "https://file-polygon.com"}
            }"#,
        );

        let settings = Settings::load_with(
            env_from(&[
                (ENV_API_KEY, "env-api-key"),
                ("POLYGON_RPC_URL", "https://env-polygon.com"),
            ]),
            Some(&path),
        );

        assert_eq!(settings.api_key.as_deref(), Some("env-api-key"));
        assert_eq!(settings.wallet_password.as_deref(), Some("file-password"));
        assert_eq!(settings.rpc_url("polygon"), Some("https://env-polygon.com"));
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"wallet_password": "file-password"}"#);

        let settings =
            Settings::load_with(env_from(&[(ENV_WALLET_PASSWORD, "")]), Some(&path));

        assert_eq!(settings.wallet_password.as_deref(), Some("file-password"));
    }

    #[test]
    fn test_malformed_file_matches_env_only() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        let env = [(ENV_API_KEY, "abc"), ("BSC_RPC_URL", "https://bsc.example")];

        let with_bad_file = Settings::load_with(env_from(&env), Some(&path));
        let env_only = Settings::load_with(env_from(&env), None);

        assert_eq!(with_bad_file, env_only);
    }

    #[test]
    fn test_missing_file_matches_env_only() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").join("config.json");
        let env = [(ENV_WALLET_PASSWORD, "pw")];

        assert_eq!(
            Settings::load_with(env_from(&env), Some(&missing)),
            Settings::load_with(env_from(&env), None)
        );
    }

    #[test]
    fn test_contract_overrides_merge_per_field() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "railgun_contracts": {
                    "ethereum": {"proxy": "0xNewProxy"},
                    "arbitrum": {"proxy": "0xArbProxy", "verifier": "0xArbVerifier"}
                }
            }"#,
        );

        let settings = Settings::load_with(env_from(&[]), Some(&path));

        let ethereum = &settings.railgun_contracts["ethereum"];
        assert_eq!(ethereum.proxy.as_deref(), Some("0xNewProxy"));
        assert_eq!(ethereum.poseidon.as_deref(), Some(POSEIDON));

        let arbitrum = &settings.railgun_contracts["arbitrum"];
        assert_eq!(arbitrum.proxy.as_deref(), Some("0xArbProxy"));
        assert_eq!(arbitrum.verifier.as_deref(), Some("0xArbVerifier"));
        assert!(arbitrum.poseidon.is_none());
    }

    #[test]
    fn test_private_key_is_credential_fallback() {
        let settings = Settings::load_with(env_from(&[(ENV_PRIVATE_KEY, "0xdeadbeef")]), None);
        assert_eq!(settings.credential(), Some("0xdeadbeef"));

        let settings = Settings::load_with(
            env_from(&[(ENV_PRIVATE_KEY, "0xdeadbeef"), (ENV_API_KEY, "key")]),
            None,
        );
        assert_eq!(settings.credential(), Some("key"));
    }

    #[test]
    fn test_lookup_helpers() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"chain_ids": {"sepolia": 11155111}}"#);
        let settings = Settings::load_with(env_from(&[]), Some(&path));

        assert_eq!(settings.chain_id("polygon"), 137);
        assert_eq!(settings.chain_id("sepolia"), 11155111);
        assert_eq!(settings.chain_id("unknown"), 1);
        assert_eq!(
            settings.railgun_proxy("bsc"),
            Some("0x590162bf4b50f6576a459b75309ee21d92178a10")
        );
        assert!(settings.railgun_proxy("arbitrum").is_none());
    }
}
