use std::env;
use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chainfolio_backend::api::{create_router, ApiState};
use chainfolio_backend::chains::ChainClientPool;
use chainfolio_backend::config::ChainRegistry;
use chainfolio_backend::portfolio::{
    prices::DEFAULT_API_BASE, BalanceResolver, PortfolioAggregator, PriceResolver, TokenCatalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let chains_path = env::var("CHAINS_FILE").unwrap_or_else(|_| "chains.json".to_string());
    let registry = Arc::new(
        ChainRegistry::load(&chains_path)
            .with_context(|| format!("loading chain registry from {chains_path}"))?,
    );
    info!("Loaded {} chain configurations", registry.len());

    let http = Client::new();
    let pool = Arc::new(ChainClientPool::connect(&registry, http.clone()).await);
    info!("Connected to {}/{} chains", pool.len(), registry.len());

    let catalog = Arc::new(TokenCatalog::new(
        Arc::clone(&registry),
        Arc::clone(&pool),
        http.clone(),
    ));
    let balances = Arc::new(BalanceResolver::new(Arc::clone(&pool)));
    let api_base =
        env::var("PRICE_ORACLE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let prices = Arc::new(PriceResolver::new(Arc::clone(&registry), http, api_base));
    let aggregator = Arc::new(PortfolioAggregator::new(catalog, balances, prices));

    let app = create_router(ApiState {
        aggregator,
        registry,
    });

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!("Portfolio service listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
