use std::sync::Arc;

use rrkv_transaction::{Transaction, TransactionRegistry, TxnId, TxnManager};

use super::store::VersionStore;
use super::transaction::MemTransaction;
use super::{Key, Value};
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult, TransactionError};

/// Owns the state shared by all transactions of one store: the registry of
/// active transactions and the version store.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone)]
pub struct MemTxnManager {
    registry: Arc<TransactionRegistry>,
    store: Arc<VersionStore>,
    config: Arc<StoreConfig>,
}

impl Default for MemTxnManager {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl TxnManager for MemTxnManager {
    type Error = StorageError;
    type Transaction = MemTransaction;

    fn begin_transaction(&self) -> Result<Arc<Self::Transaction>, Self::Error> {
        let snapshot = self
            .registry
            .begin_snapshot()
            .map_err(TransactionError::Registry)?;
        let catalog_view = self.store.catalog_view();
        tracing::debug!(
            txn_id = %snapshot.txn_id(),
            min_active = %snapshot.min_active(),
            active = snapshot.active_ids().len(),
            keys = catalog_view.len(),
            "transaction started"
        );
        Ok(Arc::new(MemTransaction::new(
            self.clone(),
            snapshot,
            catalog_view,
        )))
    }

    fn finish_transaction(&self, txn: &Self::Transaction) -> Result<(), Self::Error> {
        self.registry
            .deregister(txn.txn_id())
            .map_err(TransactionError::Registry)?;
        Ok(())
    }

    fn low_watermark(&self) -> Option<TxnId> {
        self.registry.low_watermark()
    }
}

impl MemTxnManager {
    /// Create a MemTxnManager with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            registry: Arc::new(TransactionRegistry::with_start(config.first_txn_id)),
            store: Arc::new(VersionStore::new(config.slow_token_wait)),
            config: Arc::new(config),
        }
    }

    /// Seed `key` with a committed value. See [`VersionStore::preload`].
    pub fn preload(&self, key: impl Into<Key>, value: impl Into<Value>) -> StorageResult<()> {
        self.store.preload(key, value)
    }

    pub fn registry(&self) -> &TransactionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
