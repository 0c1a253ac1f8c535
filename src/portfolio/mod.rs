pub mod aggregator;
pub mod balances;
pub mod catalog;
pub mod prices;

pub use aggregator::{
    BalanceSource, PortfolioAggregator, PriceSource, TokenDiscovery, DEFAULT_MIN_BALANCE,
};
pub use balances::{BalanceError, BalanceResolver};
pub use catalog::{CatalogError, TokenCatalog};
pub use prices::{PriceError, PriceResolver};
