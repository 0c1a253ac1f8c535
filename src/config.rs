use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Static per-chain configuration, immutable for the process lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    /// Native-currency symbol (ETH, MATIC, ...).
    pub symbol: String,
    /// Native-currency decimals.
    #[serde(default = "default_native_decimals")]
    pub decimals: u8,
    pub rpc: String,
    pub token_list_url: String,
    /// Wrapped-native contract, used as the price-lookup proxy for the
    /// native currency. Chains without one simply get no native price.
    #[serde(default)]
    pub wrapped_token_address: Option<String>,
    /// Price-oracle platform identifier for this chain.
    #[serde(default)]
    pub platform_slug: Option<String>,
    /// Symbols the catalog keeps from this chain's token list.
    #[serde(default)]
    pub tracked_symbols: Vec<String>,
}

fn default_native_decimals() -> u8 {
    18
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read chain registry from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse chain registry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid chain id key: {0:?}")]
    InvalidChainId(String),
}

/// Chain summary exposed on the discovery endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
}

/// All configured chains, keyed by chain id. Loaded once at startup and
/// shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// The registry file keys chains by stringified id, matching the usual
    /// chain-list convention; keys are parsed into `u64` here.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let parsed: HashMap<String, ChainConfig> = serde_json::from_str(raw)?;
        let mut chains = HashMap::with_capacity(parsed.len());
        for (key, config) in parsed {
            let chain_id = key
                .parse::<u64>()
                .map_err(|_| RegistryError::InvalidChainId(key.clone()))?;
            chains.insert(chain_id, config);
        }
        Ok(Self { chains })
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &ChainConfig)> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> Vec<ChainSummary> {
        let mut summaries: Vec<ChainSummary> = self
            .chains
            .iter()
            .map(|(chain_id, config)| ChainSummary {
                chain_id: *chain_id,
                name: config.name.clone(),
                symbol: config.symbol.clone(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.chain_id);
        summaries
    }
}
