pub mod api;
pub mod chains;
pub mod config;
pub mod portfolio;
pub mod types;

pub use config::{ChainConfig, ChainRegistry, ChainSummary};
pub use types::{Portfolio, Token, ZERO_ADDRESS};
