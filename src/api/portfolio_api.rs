use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::{ChainRegistry, ChainSummary};
use crate::portfolio::{PortfolioAggregator, DEFAULT_MIN_BALANCE};
use crate::types::{Portfolio, Token};

#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<PortfolioAggregator>,
    pub registry: Arc<ChainRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioRequest {
    pub wallet_address: String,
    #[serde(default)]
    pub min_balance: Option<Decimal>,
}

/// Decimals go out as strings to preserve precision across JSON.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub balance: String,
    pub logo_uri: Option<String>,
    pub usd_price: Option<String>,
    pub usd_value: Option<String>,
    pub chain_name: String,
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub wallet_address: String,
    pub tokens: Vec<TokenResponse>,
    pub total_usd_value: String,
    pub total_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: unix_now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: unix_now(),
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/portfolio", post(get_portfolio))
        .route("/chains", get(get_chains))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Portfolio API is running"))
}

async fn get_chains(State(state): State<ApiState>) -> Json<ApiResponse<Vec<ChainSummary>>> {
    Json(ApiResponse::success(state.registry.chains()))
}

async fn get_portfolio(
    State(state): State<ApiState>,
    Json(request): Json<PortfolioRequest>,
) -> Response {
    if !is_valid_address(&request.wallet_address) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<PortfolioResponse>::error(
                "Invalid wallet address format".to_string(),
            )),
        )
            .into_response();
    }

    let min_balance = match threshold_from_request(request.min_balance) {
        Ok(min_balance) => min_balance,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<PortfolioResponse>::error(message)),
            )
                .into_response();
        }
    };
    info!("Getting portfolio for address: {}", request.wallet_address);

    let portfolio = state
        .aggregator
        .get_portfolio(&request.wallet_address, min_balance)
        .await;
    let response = to_portfolio_response(portfolio, &state.registry);
    Json(ApiResponse::success(response)).into_response()
}

/// The threshold must be non-negative: anything below zero would re-admit
/// zero-balance tokens into the portfolio.
fn threshold_from_request(min_balance: Option<Decimal>) -> Result<Decimal, String> {
    let min_balance = min_balance.unwrap_or(DEFAULT_MIN_BALANCE);
    if min_balance < Decimal::ZERO {
        return Err("min_balance must be non-negative".to_string());
    }
    Ok(min_balance)
}

/// Well-formed account identifier: 0x followed by 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn to_portfolio_response(portfolio: Portfolio, registry: &ChainRegistry) -> PortfolioResponse {
    PortfolioResponse {
        wallet_address: portfolio.wallet_address,
        total_usd_value: portfolio.total_usd_value.to_string(),
        total_tokens: portfolio.total_tokens,
        tokens: portfolio
            .tokens
            .into_iter()
            .map(|token| to_token_response(token, registry))
            .collect(),
    }
}

fn to_token_response(token: Token, registry: &ChainRegistry) -> TokenResponse {
    let chain_name = registry
        .get(token.chain_id)
        .map(|config| config.name.clone())
        .unwrap_or_else(|| format!("Chain {}", token.chain_id));
    TokenResponse {
        chain_id: token.chain_id,
        address: token.address,
        symbol: token.symbol,
        name: token.name,
        decimals: token.decimals,
        balance: token.balance.to_string(),
        logo_uri: token.logo_uri,
        usd_price: token.usd_price.map(|price| price.to_string()),
        usd_value: token.usd_value.map(|value| value.to_string()),
        chain_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validates_address_shape() {
        assert!(is_valid_address(
            "0x742d35Cc6634C0532925a3b8D5c9C5E3C5F5c5c5"
        ));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x742d35Cc"));
        assert!(!is_valid_address(
            "742d35Cc6634C0532925a3b8D5c9C5E3C5F5c5c5cc"
        ));
        assert!(!is_valid_address(
            "0x742d35Cc6634C0532925a3b8D5c9C5E3C5F5c5zz"
        ));
    }

    #[test]
    fn threshold_defaults_and_rejects_negatives() {
        assert_eq!(threshold_from_request(None), Ok(DEFAULT_MIN_BALANCE));
        assert_eq!(threshold_from_request(Some(dec!(0.5))), Ok(dec!(0.5)));
        assert_eq!(
            threshold_from_request(Some(Decimal::ZERO)),
            Ok(Decimal::ZERO)
        );
        assert!(threshold_from_request(Some(dec!(-1))).is_err());
        assert!(threshold_from_request(Some(dec!(-0.000001))).is_err());
    }

    #[test]
    fn token_response_preserves_decimal_strings() {
        let registry = ChainRegistry::from_json(
            r#"{"1": {
                "name": "Ethereum",
                "symbol": "ETH",
                "rpc": "https://eth.example.com",
                "token_list_url": "https://tokens.example.com/eth.json"
            }}"#,
        )
        .unwrap();

        let mut token = Token::new(
            1,
            crate::types::ZERO_ADDRESS.to_string(),
            "ETH".to_string(),
            "Ethereum".to_string(),
            18,
            None,
        );
        token.balance = dec!(2.5);
        token.usd_price = Some(dec!(3000));
        token.usd_value = Some(dec!(7500));

        let response = to_token_response(token, &registry);
        assert_eq!(response.balance, "2.5");
        assert_eq!(response.usd_price.as_deref(), Some("3000"));
        assert_eq!(response.usd_value.as_deref(), Some("7500"));
        assert_eq!(response.chain_name, "Ethereum");
    }

    #[test]
    fn unknown_chain_gets_placeholder_name() {
        let registry = ChainRegistry::from_json("{}").unwrap();
        let token = Token::new(
            42,
            "0x6b175474e89094c44da98b954eedeac495271d0f".to_string(),
            "DAI".to_string(),
            "Dai Stablecoin".to_string(),
            18,
            None,
        );
        let response = to_token_response(token, &registry);
        assert_eq!(response.chain_name, "Chain 42");
    }
}
