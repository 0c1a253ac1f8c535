use reqwest::Client;
use std::collections::HashMap;
use tracing::{info, warn};

use super::rpc::RpcClient;
use crate::config::ChainRegistry;

/// One probed JSON-RPC client per reachable chain. Chains whose endpoint
/// fails the probe are excluded here and contribute nothing downstream.
#[derive(Debug, Default)]
pub struct ChainClientPool {
    clients: HashMap<u64, RpcClient>,
}

impl ChainClientPool {
    /// Probes every configured chain and keeps only the reachable ones.
    /// Never fails: an unreachable chain is logged and skipped.
    pub async fn connect(registry: &ChainRegistry, http: Client) -> Self {
        let mut clients = HashMap::new();
        for (chain_id, config) in registry.iter() {
            let client = RpcClient::new(*chain_id, &config.rpc, http.clone());
            match client.probe().await {
                Ok(()) => {
                    info!("Connected to {} ({})", config.name, chain_id);
                    clients.insert(*chain_id, client);
                }
                Err(e) => {
                    warn!(
                        "Could not connect to RPC for chain {} ({}): {}",
                        chain_id, config.name, e
                    );
                }
            }
        }
        Self { clients }
    }

    /// Pool over pre-built clients, bypassing the connectivity probe.
    #[cfg(test)]
    pub(crate) fn with_clients(clients: HashMap<u64, RpcClient>) -> Self {
        Self { clients }
    }

    pub fn get(&self, chain_id: u64) -> Option<&RpcClient> {
        self.clients.get(&chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.clients.contains_key(&chain_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
