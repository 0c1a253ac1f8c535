use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::balances::BalanceError;
use super::prices::PriceError;
use crate::types::{Portfolio, Token};

/// Worker-pool width for balance/price fan-out. Bounded and independent of
/// how many chains or tokens are in play.
pub const DEFAULT_WORKERS: usize = 3;

/// Dust threshold applied when the caller does not supply one.
pub const DEFAULT_MIN_BALANCE: Decimal = dec!(0.000001);

/// Produces the candidate token set for one aggregation pass.
#[async_trait]
pub trait TokenDiscovery: Send + Sync {
    async fn fetch_tokens(&self) -> Vec<Token>;
}

/// Resolves one token's on-chain balance for a wallet, in human units.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance_of(&self, wallet: &str, token: &Token) -> Result<Decimal, BalanceError>;
}

/// Resolves one token's USD spot price. `Ok(None)` means no quote exists
/// for this token, which is a normal outcome.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price_usd(&self, token: &Token) -> Result<Option<Decimal>, PriceError>;
}

/// Terminal state of one candidate token's resolution.
#[derive(Debug)]
pub enum Resolution {
    Included(Token),
    Dropped(DropReason),
}

/// Why a candidate left the pipeline. `BalanceFailed` is distinct from
/// `BelowThreshold` so an unreachable balance is never mistaken for a
/// confirmed zero in the logs, even though both end up excluded.
#[derive(Debug)]
pub enum DropReason {
    BelowThreshold,
    BalanceFailed(BalanceError),
    WorkerUnavailable,
}

/// Fans balance and price resolution out over the candidate set and folds
/// the survivors into a sorted portfolio.
pub struct PortfolioAggregator {
    catalog: Arc<dyn TokenDiscovery>,
    balances: Arc<dyn BalanceSource>,
    prices: Arc<dyn PriceSource>,
    workers: Arc<Semaphore>,
}

impl PortfolioAggregator {
    pub fn new(
        catalog: Arc<dyn TokenDiscovery>,
        balances: Arc<dyn BalanceSource>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self::with_workers(catalog, balances, prices, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        catalog: Arc<dyn TokenDiscovery>,
        balances: Arc<dyn BalanceSource>,
        prices: Arc<dyn PriceSource>,
        workers: usize,
    ) -> Self {
        Self {
            catalog,
            balances,
            prices,
            workers: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Resolves the wallet's portfolio: one task per candidate token,
    /// bounded by the worker semaphore. A failing task drops only its own
    /// token; if everything fails the result is an empty, valid portfolio.
    pub async fn get_portfolio(&self, wallet: &str, min_balance: Decimal) -> Portfolio {
        // A negative threshold would admit zero balances, and a priced zero
        // balance would carry a zero usd_value; zero is the floor.
        let min_balance = min_balance.max(Decimal::ZERO);
        let candidates = self.catalog.fetch_tokens().await;
        info!(
            "Resolving {} candidate tokens for {}",
            candidates.len(),
            wallet
        );

        let mut handles = Vec::with_capacity(candidates.len());
        for token in candidates {
            let workers = Arc::clone(&self.workers);
            let balances = Arc::clone(&self.balances);
            let prices = Arc::clone(&self.prices);
            let wallet = wallet.to_string();
            handles.push(tokio::spawn(async move {
                // The permit covers the balance call and the conditional
                // price call, so at most `workers` tokens are in flight.
                let Ok(_permit) = workers.acquire_owned().await else {
                    warn!(
                        "Worker pool closed before {} on chain {} could be resolved",
                        token.symbol, token.chain_id
                    );
                    return Resolution::Dropped(DropReason::WorkerUnavailable);
                };
                resolve_token(&*balances, &*prices, &wallet, token, min_balance).await
            }));
        }

        let mut tokens = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(Resolution::Included(token)) => tokens.push(token),
                Ok(Resolution::Dropped(_)) => {}
                Err(e) => warn!("Token resolution task failed: {}", e),
            }
        }

        sort_tokens(&mut tokens);
        let total_usd_value: Decimal = tokens.iter().filter_map(|t| t.usd_value).sum();
        info!(
            "Found {} tokens above threshold for {} (total ${})",
            tokens.len(),
            wallet,
            total_usd_value
        );

        Portfolio {
            wallet_address: wallet.to_string(),
            total_usd_value,
            total_tokens: tokens.len(),
            tokens,
            last_updated: unix_now(),
        }
    }
}

/// Per-token pipeline: balance check first, price attempt only after the
/// threshold passes. Failures terminate in `Dropped`, never in a panic.
async fn resolve_token(
    balances: &dyn BalanceSource,
    prices: &dyn PriceSource,
    wallet: &str,
    mut token: Token,
    min_balance: Decimal,
) -> Resolution {
    let balance = match balances.balance_of(wallet, &token).await {
        Ok(balance) if balance > min_balance => balance,
        Ok(_) => return Resolution::Dropped(DropReason::BelowThreshold),
        Err(e) => {
            warn!(
                "Balance lookup failed for {} on chain {}: {}",
                token.symbol, token.chain_id, e
            );
            return Resolution::Dropped(DropReason::BalanceFailed(e));
        }
    };
    token.balance = balance;

    match prices.price_usd(&token).await {
        Ok(Some(price)) => {
            token.usd_price = Some(price);
            token.usd_value = Some(balance * price);
        }
        Ok(None) => {}
        Err(e) => {
            // An unpriced holding still belongs in the portfolio.
            warn!(
                "Price lookup failed for {} on chain {}: {}",
                token.symbol, token.chain_id, e
            );
        }
    }

    Resolution::Included(token)
}

/// Descending by USD value when priced, balance otherwise. The
/// `(chain_id, address)` tie-break keeps repeated runs byte-identical no
/// matter which tasks finished first.
pub fn sort_tokens(tokens: &mut [Token]) {
    tokens.sort_by(|a, b| {
        b.sort_key()
            .cmp(&a.sort_key())
            .then_with(|| a.chain_id.cmp(&b.chain_id))
            .then_with(|| a.address.cmp(&b.address))
    });
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
