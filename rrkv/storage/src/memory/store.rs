use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::RwLock;
use rrkv_transaction::{Snapshot, TxnId};

use super::record::{Record, TokenGrant, Version};
use super::{Key, Value};
use crate::error::{StorageResult, TransactionError};

/// Point-in-time copy of which keys exist. The records are shared, so their
/// chains keep evolving and are filtered through a snapshot when read.
pub type CatalogView = HashMap<Key, Arc<Record>>;

/// The key to record catalog.
///
/// Records are created lazily on the first write of a key and are never
/// removed.
pub struct VersionStore {
    catalog: RwLock<CatalogView>,
    slow_token_wait: Duration,
}

impl VersionStore {
    pub fn new(slow_token_wait: Duration) -> Self {
        Self {
            catalog: RwLock::new(HashMap::new()),
            slow_token_wait,
        }
    }

    /// Install `key` with an already committed `value`, visible to every
    /// transaction. Meant for seeding the store before transactions run.
    pub fn preload(&self, key: impl Into<Key>, value: impl Into<Value>) -> StorageResult<()> {
        let key = key.into();
        match self.catalog.write().entry(key.clone()) {
            Entry::Occupied(_) => Err(TransactionError::KeyExists(key).into()),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Record::committed(key, value.into())));
                Ok(())
            }
        }
    }

    pub fn catalog_view(&self) -> CatalogView {
        self.catalog.read().clone()
    }

    pub fn record(&self, key: &str) -> Option<Arc<Record>> {
        self.catalog.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.catalog.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.catalog.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.read().is_empty()
    }

    /// Newest version of `key` visible under `snapshot`, looked up in the live
    /// catalog.
    pub fn get(&self, key: &str, snapshot: &Snapshot) -> Option<Version> {
        self.record(key)?.read_visible(snapshot)
    }

    /// Append `value` to `key` on behalf of `txn_id` and return the key's record.
    ///
    /// A new key is installed with the write as its first version and the token
    /// already held by `txn_id`. If another transaction installs the key first,
    /// this falls back to the regular path: wait for the token, then append.
    ///
    /// The token is kept after this returns. A transaction that writes several
    /// keys holds all of their tokens until it finalizes, so two transactions
    /// writing the same keys in different orders can deadlock. Nothing detects
    /// that; callers must write shared keys in a consistent order.
    pub fn write(&self, key: Key, value: Value, txn_id: TxnId) -> Arc<Record> {
        let existing = self.catalog.read().get(&key).cloned();
        let record = match existing {
            Some(record) => record,
            None => match self.catalog.write().entry(key.clone()) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let record = Arc::new(Record::created_by(key, value, txn_id));
                    entry.insert(record.clone());
                    tracing::trace!(key = %record.key(), %txn_id, "record created");
                    return record;
                }
            },
        };

        self.acquire_token(&record, txn_id);
        record.append(Version::new(key, value, txn_id));
        record
    }

    fn acquire_token(&self, record: &Record, txn_id: TxnId) {
        if let TokenGrant::Granted {
            waited: Some(waited),
        } = record.token().acquire(txn_id)
        {
            if waited >= self.slow_token_wait {
                tracing::warn!(
                    key = %record.key(),
                    %txn_id,
                    ?waited,
                    "slow write token acquisition"
                );
            } else {
                tracing::debug!(
                    key = %record.key(),
                    %txn_id,
                    ?waited,
                    "waited for write token"
                );
            }
        }
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
