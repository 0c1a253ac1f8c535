use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::aggregator::TokenDiscovery;
use crate::chains::ChainClientPool;
use crate::config::{ChainConfig, ChainRegistry};
use crate::types::{Token, ZERO_ADDRESS};

const LIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed token list: {0}")]
    Malformed(String),
}

/// Derives the candidate token set: per chain, the tracked entries of its
/// external token list plus one synthesized native-currency entry.
pub struct TokenCatalog {
    registry: Arc<ChainRegistry>,
    pool: Arc<ChainClientPool>,
    http: Client,
}

impl TokenCatalog {
    pub fn new(registry: Arc<ChainRegistry>, pool: Arc<ChainClientPool>, http: Client) -> Self {
        Self {
            registry,
            pool,
            http,
        }
    }

    /// Candidates for one aggregation pass. Chains without a live RPC
    /// client are skipped entirely; a failed token-list fetch drops only
    /// that chain's list-derived entries, never its native entry.
    pub async fn fetch_tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (chain_id, config) in self.registry.iter() {
            if !self.pool.contains(*chain_id) {
                continue;
            }
            match self.fetch_chain_list(*chain_id, config).await {
                Ok(mut listed) => {
                    info!(
                        "Fetched {} tracked tokens for {} ({})",
                        listed.len(),
                        config.name,
                        chain_id
                    );
                    tokens.append(&mut listed);
                }
                Err(e) => {
                    warn!(
                        "Error loading token list for chain {} ({}): {}",
                        chain_id, config.name, e
                    );
                }
            }
            tokens.push(native_token(*chain_id, config));
        }
        tokens
    }

    async fn fetch_chain_list(
        &self,
        chain_id: u64,
        config: &ChainConfig,
    ) -> Result<Vec<Token>, CatalogError> {
        let body: Value = self
            .http
            .get(&config.token_list_url)
            .timeout(LIST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_token_list(&body, chain_id, &config.tracked_symbols)
    }
}

#[async_trait]
impl TokenDiscovery for TokenCatalog {
    async fn fetch_tokens(&self) -> Vec<Token> {
        TokenCatalog::fetch_tokens(self).await
    }
}

fn native_token(chain_id: u64, config: &ChainConfig) -> Token {
    Token::new(
        chain_id,
        ZERO_ADDRESS.to_string(),
        config.symbol.clone(),
        config.name.clone(),
        config.decimals,
        None,
    )
}

/// Walks the standard token-list shape, keeping entries that belong to
/// `chain_id` and carry a tracked symbol. Addresses are lowercased so the
/// `(chain_id, address)` identity is canonical.
fn parse_token_list(
    body: &Value,
    chain_id: u64,
    tracked: &[String],
) -> Result<Vec<Token>, CatalogError> {
    let entries = body
        .get("tokens")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Malformed("missing tokens array".to_string()))?;

    let mut tokens = Vec::new();
    for entry in entries {
        if let (Some(entry_chain), Some(address), Some(symbol), Some(name), Some(decimals)) = (
            entry.get("chainId").and_then(Value::as_u64),
            entry.get("address").and_then(Value::as_str),
            entry.get("symbol").and_then(Value::as_str),
            entry.get("name").and_then(Value::as_str),
            entry.get("decimals").and_then(Value::as_u64),
        ) {
            if entry_chain != chain_id || address.is_empty() {
                continue;
            }
            if !tracked.iter().any(|s| s.eq_ignore_ascii_case(symbol)) {
                continue;
            }
            tokens.push(Token::new(
                chain_id,
                address.to_lowercase(),
                symbol.to_uppercase(),
                name.to_string(),
                decimals as u8,
                entry
                    .get("logoURI")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ));
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracked() -> Vec<String> {
        vec!["DAI".to_string()]
    }

    fn sample_list() -> Value {
        json!({
            "name": "Example List",
            "tokens": [
                {
                    "chainId": 1,
                    "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
                    "symbol": "DAI",
                    "name": "Dai Stablecoin",
                    "decimals": 18,
                    "logoURI": "https://example.com/dai.png"
                },
                {
                    "chainId": 1,
                    "address": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                    "symbol": "WETH",
                    "name": "Wrapped Ether",
                    "decimals": 18
                },
                {
                    "chainId": 137,
                    "address": "0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063",
                    "symbol": "DAI",
                    "name": "Dai Stablecoin (PoS)",
                    "decimals": 18
                },
                {
                    "chainId": 1,
                    "symbol": "BROKEN",
                    "name": "No Address"
                }
            ]
        })
    }

    #[test]
    fn keeps_only_tracked_symbols_on_the_right_chain() {
        let tokens = parse_token_list(&sample_list(), 1, &tracked()).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "DAI");
        assert_eq!(tokens[0].chain_id, 1);
        assert_eq!(
            tokens[0].address,
            "0x6b175474e89094c44da98b954eedeac495271d0f"
        );
        assert_eq!(
            tokens[0].logo_uri.as_deref(),
            Some("https://example.com/dai.png")
        );
    }

    #[test]
    fn tracked_match_is_case_insensitive() {
        let list = json!({"tokens": [{
            "chainId": 1,
            "address": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "symbol": "dai",
            "name": "Dai Stablecoin",
            "decimals": 18
        }]});
        let tokens = parse_token_list(&list, 1, &tracked()).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "DAI");
    }

    #[test]
    fn empty_tracked_set_yields_no_list_entries() {
        let tokens = parse_token_list(&sample_list(), 1, &[]).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn missing_tokens_field_is_malformed() {
        assert!(matches!(
            parse_token_list(&json!({"name": "empty"}), 1, &tracked()),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn native_entry_survives_token_list_failure() {
        use crate::chains::RpcClient;
        use reqwest::Client;
        use std::collections::HashMap;

        let registry = Arc::new(
            ChainRegistry::from_json(
                r#"{"999": {
                    "name": "Deadnet",
                    "symbol": "DEAD",
                    "decimals": 18,
                    "rpc": "http://127.0.0.1:1",
                    "token_list_url": "http://127.0.0.1:1/tokens.json",
                    "tracked_symbols": ["DAI"]
                }}"#,
            )
            .unwrap(),
        );
        let mut clients = HashMap::new();
        clients.insert(999, RpcClient::new(999, "http://127.0.0.1:1", Client::new()));
        let pool = Arc::new(ChainClientPool::with_clients(clients));

        let catalog = TokenCatalog::new(registry, pool, Client::new());
        let tokens = catalog.fetch_tokens().await;

        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_native());
        assert_eq!(tokens[0].symbol, "DEAD");
        assert_eq!(tokens[0].chain_id, 999);
    }

    #[tokio::test]
    async fn chains_without_a_client_contribute_nothing() {
        use reqwest::Client;

        let registry = Arc::new(
            ChainRegistry::from_json(
                r#"{"999": {
                    "name": "Deadnet",
                    "symbol": "DEAD",
                    "rpc": "http://127.0.0.1:1",
                    "token_list_url": "http://127.0.0.1:1/tokens.json"
                }}"#,
            )
            .unwrap(),
        );
        let pool = Arc::new(ChainClientPool::default());

        let catalog = TokenCatalog::new(registry, pool, Client::new());
        assert!(catalog.fetch_tokens().await.is_empty());
    }

    #[test]
    fn native_entry_uses_chain_config() {
        let registry = ChainRegistry::from_json(
            r#"{"1": {
                "name": "Ethereum",
                "symbol": "ETH",
                "decimals": 18,
                "rpc": "https://eth.example.com",
                "token_list_url": "https://tokens.example.com/eth.json"
            }}"#,
        )
        .unwrap();
        let native = native_token(1, registry.get(1).unwrap());
        assert!(native.is_native());
        assert_eq!(native.symbol, "ETH");
        assert_eq!(native.decimals, 18);
        assert_eq!(native.balance, rust_decimal::Decimal::ZERO);
    }
}
