use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::aggregator::PriceSource;
use crate::config::{ChainConfig, ChainRegistry};
use crate::types::Token;

pub const DEFAULT_API_BASE: &str = "https://api.coingecko.com/api/v3";

const PRICE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price oracle returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Resolves USD spot prices from an external oracle, keyed by the chain's
/// platform slug and a contract address. The native currency is priced via
/// its configured wrapped-token contract.
pub struct PriceResolver {
    registry: Arc<ChainRegistry>,
    http: Client,
    api_base: String,
}

impl PriceResolver {
    pub fn new(registry: Arc<ChainRegistry>, http: Client, api_base: impl Into<String>) -> Self {
        Self {
            registry,
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// `Ok(None)` covers every expected no-quote case: unknown chain,
    /// chain without a platform slug, native currency without a wrapped
    /// address, or an oracle response with no entry for the address.
    /// Transport and decoding failures are `Err`.
    pub async fn price_usd(&self, token: &Token) -> Result<Option<Decimal>, PriceError> {
        let Some(config) = self.registry.get(token.chain_id) else {
            debug!("Chain {} not found in registry", token.chain_id);
            return Ok(None);
        };
        let Some(platform) = config.platform_slug.as_deref() else {
            debug!("No price platform configured for chain {}", token.chain_id);
            return Ok(None);
        };
        let Some(lookup) = lookup_address(token, config) else {
            debug!(
                "No wrapped token configured for native {} on chain {}",
                token.symbol, token.chain_id
            );
            return Ok(None);
        };

        let url = format!("{}/simple/token_price/{}", self.api_base, platform);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("contract_addresses", lookup.as_str()),
                ("vs_currencies", "usd"),
            ])
            .timeout(PRICE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Status(status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceError::Malformed(e.to_string()))?;
        Ok(extract_quote(&body, &lookup))
    }
}

#[async_trait]
impl PriceSource for PriceResolver {
    async fn price_usd(&self, token: &Token) -> Result<Option<Decimal>, PriceError> {
        PriceResolver::price_usd(self, token).await
    }
}

/// The oracle knows contracts, not native currencies, so the zero address
/// maps to the chain's wrapped-token contract.
fn lookup_address(token: &Token, config: &ChainConfig) -> Option<String> {
    if token.is_native() {
        config
            .wrapped_token_address
            .as_ref()
            .map(|address| address.to_lowercase())
    } else {
        Some(token.address.to_lowercase())
    }
}

fn extract_quote(body: &Value, address: &str) -> Option<Decimal> {
    body.get(address)?
        .get("usd")?
        .as_f64()
        .and_then(Decimal::from_f64_retain)
        .map(|price| price.normalize())
}
