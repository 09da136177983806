//! Per-coin backend collaborator contract.
//!
//! Each configured coin is served by one [`Backend`]: the accounting,
//! statistics and payout engine for that coin. The frontend never owns a
//! backend's internals; it consumes them through this trait and assumes every
//! async call completes exactly once.

pub mod fanout;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// Static description of a configured coin.
#[derive(Debug, Clone)]
pub struct CoinInfo {
    pub name: String,
    pub full_name: String,
    pub default_payout_threshold: String,
}

#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub clients: u64,
    pub workers: u64,
    pub hash_rate: u64,
    pub shares_per_second: f64,
    pub last_share_time: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub workers: u64,
    pub hash_rate: u64,
    pub shares_per_second: f64,
    pub last_share_time: i64,
}

/// Account balance figures, as decimal strings in coin units.
#[derive(Debug, Clone, Default)]
pub struct UserBalance {
    pub balance: String,
    pub requested: String,
    pub paid: String,
}

#[derive(Debug, Clone)]
pub struct FoundBlock {
    pub height: u64,
    pub hash: String,
    pub time: i64,
    pub generated_coins: String,
}

#[derive(Debug, Clone)]
pub struct PayoutRecord {
    pub time: i64,
    pub tx_id: String,
    pub value: String,
}

/// Accounting, statistics and payout operations of one coin.
///
/// All calls are single-shot; result payloads are owned by the completion
/// and safe to move across worker threads.
#[async_trait]
pub trait Backend: Send + Sync {
    fn coin(&self) -> &CoinInfo;

    /// Address-format check for this coin.
    fn validate_address(&self, address: &str) -> bool;

    async fn query_pool_stats(&self) -> PoolStats;

    async fn query_user_stats(&self, login: &str) -> UserStats;

    async fn query_user_balance(&self, login: &str) -> UserBalance;

    async fn query_found_blocks(&self, count: usize) -> Vec<FoundBlock>;

    async fn query_payouts(&self, login: &str, count: usize) -> Vec<PayoutRecord>;

    /// Force a payout of the user's current balance. Returns the status
    /// string reported by the accounting engine.
    async fn manual_payout(&self, login: &str) -> String;
}

/// Configured backends in ascending coin-name order plus a name index.
///
/// The order fixes fan-out output ordering regardless of completion order;
/// the index serves single-coin lookups. Read-only after startup.
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
    index: HashMap<String, usize>,
}

impl BackendRegistry {
    pub fn new(mut backends: Vec<Arc<dyn Backend>>) -> Self {
        backends.sort_by(|a, b| a.coin().name.cmp(&b.coin().name));
        let index = backends
            .iter()
            .enumerate()
            .map(|(i, backend)| (backend.coin().name.clone(), i))
            .collect();
        Self { backends, index }
    }

    pub fn get(&self, coin: &str) -> Option<&Arc<dyn Backend>> {
        self.index.get(coin).map(|&i| &self.backends[i])
    }

    /// All backends in ascending coin-name order.
    pub fn all(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("coins", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    #[test]
    fn registry_sorts_by_coin_name() {
        let registry = BackendRegistry::new(vec![
            MockBackend::new("LTC").into_arc(),
            MockBackend::new("BTC").into_arc(),
            MockBackend::new("DOGE").into_arc(),
        ]);

        let names: Vec<_> = registry
            .all()
            .iter()
            .map(|b| b.coin().name.clone())
            .collect();
        assert_eq!(names, ["BTC", "DOGE", "LTC"]);
    }

    #[test]
    fn registry_lookup_by_name() {
        let registry = BackendRegistry::new(vec![
            MockBackend::new("LTC").into_arc(),
            MockBackend::new("BTC").into_arc(),
        ]);

        assert_eq!(registry.get("BTC").unwrap().coin().name, "BTC");
        assert!(registry.get("XMR").is_none());
    }
}
