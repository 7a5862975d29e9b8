//! Configuration for the request client.
//!
//! Configuration is a single JSON document describing the ledger connection and the
//! deployed request contracts:
//!
//! ```json
//! {
//!   "chain_id": 1337,
//!   "rpc": [{ "http": "$RPC_URL", "rate_limit": 50 }],
//!   "signers": ["${PRIVATE_KEY}"],
//!   "request_core": "0x8f0483125fcb9aaaefa9209d8e9d7b9c8b9fb90f",
//!   "currency_contracts": {
//!     "0x345ca3e014aaf5dca488057592ee47305d9b3e10": "0x2c2b9c9a4a25e24b174f26114e8926a9f2128fe4"
//!   }
//! }
//! ```
//!
//! # Environment Variable Resolution
//!
//! Values wrapped in [`LiteralOrEnv`] may be given literally or as `$VAR` / `${VAR}`
//! references, resolved during deserialization. This keeps RPC credentials and private
//! keys out of the configuration file.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestNetworkConfig {
    /// EIP-155 chain id of the ledger.
    pub chain_id: u64,
    /// RPC providers, used with fallback in the given order.
    pub rpc: Vec<RpcConfig>,
    /// Local signers. When empty, the node's own accounts are used.
    #[serde(default)]
    pub signers: Vec<LiteralOrEnv<EvmPrivateKey>>,
    /// Whether the chain supports EIP-1559 gas pricing.
    #[serde(default = "config_defaults::default_eip1559")]
    pub eip1559: bool,
    /// How long to wait for a transaction receipt.
    #[serde(default = "config_defaults::default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// Address of the core contract issuing request identifiers.
    pub request_core: Address,
    /// Supported tokens, mapped to their currency contract.
    #[serde(default)]
    pub currency_contracts: HashMap<Address, Address>,
}

/// RPC provider configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcConfig {
    /// HTTP URL for the RPC endpoint.
    pub http: LiteralOrEnv<Url>,
    /// Rate limit for requests per second (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

/// Deployed request contracts: the core and the per-token currency contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContracts {
    core: Address,
    currency_contracts: HashMap<Address, Address>,
}

impl RequestContracts {
    pub fn new(core: Address) -> Self {
        Self {
            core,
            currency_contracts: HashMap::new(),
        }
    }

    /// Registers the currency contract handling `token`.
    pub fn with_currency_contract(mut self, token: Address, currency_contract: Address) -> Self {
        self.currency_contracts.insert(token, currency_contract);
        self
    }

    pub fn core(&self) -> Address {
        self.core
    }

    /// Currency contract for `token`, if the token is supported.
    pub fn currency_contract(&self, token: &Address) -> Option<Address> {
        self.currency_contracts.get(token).copied()
    }
}

impl RequestNetworkConfig {
    pub fn contracts(&self) -> RequestContracts {
        RequestContracts {
            core: self.request_core,
            currency_contracts: self.currency_contracts.clone(),
        }
    }

    /// Load configuration from a JSON file.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

mod config_defaults {
    pub fn default_eip1559() -> bool {
        true
    }
    pub fn default_receipt_timeout_secs() -> u64 {
        30
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// A validated EVM private key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0.0
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid evm private key: {}", e))
    }
}

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"http://localhost:8545"`
/// - Simple env var: `"$RPC_URL"`
/// - Braced env var: `"${RPC_URL}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Returns the variable name if `s` matches `$VAR` or `${VAR}` syntax.
    fn parse_env_var_syntax(s: &str) -> Option<&str> {
        if let Some(braced) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            Some(braced)
        } else {
            let var_name = s.strip_prefix('$')?;
            let is_name =
                !var_name.is_empty() && var_name.chars().all(|c| c.is_alphanumeric() || c == '_');
            is_name.then_some(var_name)
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = match Self::parse_env_var_syntax(&s) {
            Some(var_name) => std::env::var(var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?,
            None => s,
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
