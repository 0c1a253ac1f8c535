use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use super::aggregator::BalanceSource;
use crate::chains::{ChainClientPool, RpcError};
use crate::types::{scale_raw_amount, AmountError, Token};

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("no RPC client for chain {0}")]
    MissingClient(u64),
    #[error("balance query failed: {0}")]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Resolves a single token's on-chain balance. One round-trip per call,
/// no caching.
pub struct BalanceResolver {
    pool: Arc<ChainClientPool>,
}

impl BalanceResolver {
    pub fn new(pool: Arc<ChainClientPool>) -> Self {
        Self { pool }
    }

    /// Native balances come from `eth_getBalance` and scale by the chain's
    /// native decimals; contract balances come from `balanceOf` and scale
    /// by the token's own decimals. Every failure mode is a typed error so
    /// the caller can tell "unreachable" from a confirmed zero.
    pub async fn balance_of(&self, wallet: &str, token: &Token) -> Result<Decimal, BalanceError> {
        let client = self
            .pool
            .get(token.chain_id)
            .ok_or(BalanceError::MissingClient(token.chain_id))?;

        let raw = if token.is_native() {
            client.native_balance(wallet).await?
        } else {
            client.erc20_balance(&token.address, wallet).await?
        };

        Ok(scale_raw_amount(raw, token.decimals)?)
    }
}

#[async_trait]
impl BalanceSource for BalanceResolver {
    async fn balance_of(&self, wallet: &str, token: &Token) -> Result<Decimal, BalanceError> {
        BalanceResolver::balance_of(self, wallet, token).await
    }
}
