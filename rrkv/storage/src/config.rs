use std::time::Duration;

use rrkv_transaction::TxnId;
use serde::{Deserialize, Serialize};

/// Configuration for a [`MemTxnManager`](crate::memory::MemTxnManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The first transaction id handed out. Values below 1 are raised to 1.
    pub first_txn_id: u64,
    /// Writers blocked on a write token for at least this long log a warning.
    pub slow_token_wait: Duration,
    /// Roll back transactions dropped while still active. When disabled such a
    /// transaction keeps its write tokens and its active entry forever.
    pub rollback_on_drop: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            first_txn_id: TxnId::FIRST,
            slow_token_wait: Duration::from_millis(100),
            rollback_on_drop: true,
        }
    }
}
