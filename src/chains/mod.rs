pub mod pool;
pub mod rpc;

pub use pool::ChainClientPool;
pub use rpc::{RpcClient, RpcError};
