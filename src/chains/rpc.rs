use ethereum_types::U256;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

// ERC-20 balanceOf(address) selector.
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
    #[error("malformed address: {0}")]
    MalformedAddress(String),
}

/// JSON-RPC client for one chain's node endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    chain_id: u64,
    endpoint: String,
    http: Client,
}

impl RpcClient {
    pub fn new(chain_id: u64, endpoint: &str, http: Client) -> Self {
        Self {
            chain_id,
            endpoint: endpoint.to_string(),
            http,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Connectivity check used when building the client pool.
    pub async fn probe(&self) -> Result<(), RpcError> {
        self.request("eth_chainId", json!([])).await.map(|_| ())
    }

    /// Wallet balance of the chain's native currency, in its smallest
    /// denomination.
    pub async fn native_balance(&self, address: &str) -> Result<U256, RpcError> {
        let result = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&result)
    }

    /// Read-only `balanceOf(holder)` call against a token contract.
    pub async fn erc20_balance(&self, token_address: &str, holder: &str) -> Result<U256, RpcError> {
        let data = balance_of_calldata(holder)?;
        let call = json!([{ "to": token_address, "data": data }, "latest"]);
        let result = self.request("eth_call", call).await?;
        parse_quantity(&result)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .timeout(RPC_TIMEOUT)
            .send()
            .await?;

        let body: Value = response.json().await?;
        if let Some(error) = body.get("error") {
            return Err(RpcError::Rpc(error.to_string()));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("missing result field".to_string()))
    }
}

fn balance_of_calldata(holder: &str) -> Result<String, RpcError> {
    let stripped = holder
        .strip_prefix("0x")
        .filter(|rest| rest.len() == 40 && rest.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| RpcError::MalformedAddress(holder.to_string()))?;
    Ok(format!(
        "{}{:0>64}",
        BALANCE_OF_SELECTOR,
        stripped.to_lowercase()
    ))
}

/// Parses a `0x`-prefixed hex quantity. Balances are uint256, so they are
/// decoded as `U256` rather than a fixed-width machine integer.
fn parse_quantity(value: &Value) -> Result<U256, RpcError> {
    let hex = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("non-string quantity: {value}")))?;
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity {hex}: {e}")))
}
