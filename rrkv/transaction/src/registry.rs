//! Active transaction bookkeeping
//!
//! The registry issues transaction ids and tracks which transactions have begun
//! but not yet finalized. All mutations of the active set go through one mutex,
//! so a snapshot never observes a partially updated set.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::snapshot::Snapshot;
use crate::txn_id::{TransactionIdGenerator, TxnId};

pub struct TransactionRegistry {
    id_generator: TransactionIdGenerator,
    active: Mutex<BTreeSet<TxnId>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::with_start(TxnId::FIRST)
    }

    /// Create a registry whose first issued id is `start`.
    pub fn with_start(start: u64) -> Self {
        Self {
            id_generator: TransactionIdGenerator::with_start(start),
            active: Mutex::new(BTreeSet::new()),
        }
    }

    /// Issue a fresh id without registering it.
    pub fn next_id(&self) -> Result<TxnId, RegistryError> {
        Ok(self.id_generator.next()?)
    }

    /// Issue an id for a new transaction, mark it active and capture its snapshot.
    ///
    /// The id is drawn while the active set is locked. Ids therefore enter the set
    /// in issuance order, and no transaction with a smaller id can register after a
    /// snapshot that does not list it has been taken.
    pub fn begin_snapshot(&self) -> Result<Snapshot, RegistryError> {
        let mut active = self.active.lock();
        let txn_id = self.next_id()?;
        active.insert(txn_id);
        let snapshot = Snapshot::new(txn_id, active.iter().copied().collect());
        tracing::trace!(
            %txn_id,
            min_active = %snapshot.min_active(),
            max_active = %snapshot.max_active(),
            active = snapshot.active_ids().len(),
            "snapshot taken"
        );
        Ok(snapshot)
    }

    /// Remove `txn_id` from the active set. Called once per transaction when it
    /// finalizes.
    pub fn deregister(&self, txn_id: TxnId) -> Result<(), RegistryError> {
        if self.active.lock().remove(&txn_id) {
            Ok(())
        } else {
            Err(RegistryError::NotActive(txn_id))
        }
    }

    pub fn is_active(&self, txn_id: TxnId) -> bool {
        self.active.lock().contains(&txn_id)
    }

    /// Currently active ids, ascending.
    pub fn active_ids(&self) -> Vec<TxnId> {
        self.active.lock().iter().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// The oldest active transaction, if any.
    pub fn low_watermark(&self) -> Option<TxnId> {
        self.active.lock().first().copied()
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
