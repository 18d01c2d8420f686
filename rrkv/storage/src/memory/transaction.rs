use parking_lot::RwLock;
use rrkv_transaction::{Snapshot, Transaction, TxnId, TxnManager, TxnState};

use super::store::CatalogView;
use super::txn_manager::MemTxnManager;
use super::{Key, Value};
use crate::error::{StorageError, StorageResult, TransactionError};

/// A repeatable-read transaction over a [`VersionStore`](super::VersionStore).
///
/// A transaction may be shared across threads. Reads and writes run
/// concurrently with each other, and a read never waits on a write parked on
/// another transaction's token. Commit and rollback wait for in-flight writes of
/// this transaction to return.
pub struct MemTransaction {
    manager: MemTxnManager,

    // ---- Fixed at begin ----
    snapshot: Snapshot,
    /// Keys that existed at begin, plus the keys written by this transaction
    catalog_view: RwLock<CatalogView>,

    // ---- Write tracking ----
    /// Keys written, in first-write order. The token of each is held.
    write_set: RwLock<Vec<Key>>,

    state: RwLock<TxnState>,
}

impl Transaction for MemTransaction {
    type Error = StorageError;

    fn txn_id(&self) -> TxnId {
        self.snapshot.txn_id()
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn state(&self) -> TxnState {
        // Does not queue behind a pending commit or rollback
        *self.state.read_recursive()
    }

    fn commit(&self) -> Result<(), Self::Error> {
        let mut state = self.state.write();
        self.check_active(*state)?;
        *state = TxnState::Committed;

        let write_set = self.write_set.read().clone();
        let result = self.finish(&write_set);
        tracing::debug!(txn_id = %self.txn_id(), writes = write_set.len(), "transaction committed");
        result
    }

    fn rollback(&self) -> Result<(), Self::Error> {
        let mut state = self.state.write();
        self.check_active(*state)?;
        *state = TxnState::RolledBack;

        let txn_id = self.txn_id();
        let write_set = self.write_set.read().clone();
        let conflict = {
            let view = self.catalog_view.read();
            // Check every key before touching any chain. On a violation this
            // transaction's versions are still removed wherever they sit, since once
            // it is deregistered they would read as committed.
            let conflict = write_set.iter().find_map(|key| {
                let tail = view.get(key).and_then(|record| record.tail_creator());
                (tail != Some(txn_id)).then(|| TransactionError::RollbackConflict {
                    key: key.clone(),
                    txn_id,
                    tail,
                })
            });
            for key in &write_set {
                if let Some(record) = view.get(key) {
                    let removed = if conflict.is_none() {
                        record.truncate_created_by(txn_id)
                    } else {
                        record.remove_created_by(txn_id)
                    };
                    tracing::trace!(%key, %txn_id, removed, "versions discarded");
                }
            }
            conflict
        };

        let result = self.finish(&write_set);
        if let Some(err) = conflict {
            tracing::error!(%txn_id, error = %err, "rollback protocol violation");
            return Err(err.into());
        }
        tracing::debug!(%txn_id, writes = write_set.len(), "transaction rolled back");
        result
    }
}

impl MemTransaction {
    pub(super) fn new(manager: MemTxnManager, snapshot: Snapshot, catalog_view: CatalogView) -> Self {
        Self {
            manager,
            snapshot,
            catalog_view: RwLock::new(catalog_view),
            write_set: RwLock::new(Vec::new()),
            state: RwLock::new(TxnState::Active),
        }
    }

    /// Read `key` as of this transaction's snapshot. `Ok(None)` means the key does
    /// not exist for this transaction.
    ///
    /// Reads never wait for writers, and two reads of the same key return the same
    /// value unless this transaction wrote the key in between.
    pub fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.check_active(self.state())?;
        let Some(record) = self.catalog_view.read().get(key).cloned() else {
            return Ok(None);
        };
        Ok(record
            .read_visible(&self.snapshot)
            .map(|version| version.value().clone()))
    }

    /// Write `value` to `key`.
    ///
    /// Blocks while another transaction holds the key's write token, and keeps the
    /// token until this transaction commits or rolls back. See
    /// [`VersionStore::write`](super::VersionStore::write) for the lock ordering
    /// obligation this puts on callers.
    pub fn write(&self, key: impl Into<Key>, value: impl Into<Value>) -> StorageResult<()> {
        let state = self.state.read();
        self.check_active(*state)?;

        let key = key.into();
        let record = self
            .manager
            .store()
            .write(key.clone(), value.into(), self.txn_id());

        let mut write_set = self.write_set.write();
        if !write_set.contains(&key) {
            write_set.push(key.clone());
        }
        self.catalog_view.write().entry(key).or_insert(record);
        Ok(())
    }

    /// Keys written by this transaction, in first-write order.
    pub fn write_set(&self) -> Vec<Key> {
        self.write_set.read().clone()
    }

    fn check_active(&self, state: TxnState) -> StorageResult<()> {
        if state.is_terminal() {
            return Err(TransactionError::InvalidState {
                txn_id: self.txn_id(),
                state,
            }
            .into());
        }
        Ok(())
    }

    /// Deregister, then release every held token in write order. Every step runs
    /// even if an earlier one fails; the first failure is returned.
    fn finish(&self, write_set: &[Key]) -> StorageResult<()> {
        let txn_id = self.txn_id();
        let mut result = self.manager.finish_transaction(self);

        let view = self.catalog_view.read();
        for key in write_set {
            let released = view
                .get(key)
                .is_some_and(|record| record.token().release(txn_id));
            if !released && result.is_ok() {
                result = Err(TransactionError::TokenNotHeld {
                    key: key.clone(),
                    txn_id,
                }
                .into());
            }
        }
        result
    }
}

impl Drop for MemTransaction {
    fn drop(&mut self) {
        if self.state().is_terminal() {
            return;
        }
        let txn_id = self.txn_id();
        if !self.manager.config().rollback_on_drop {
            tracing::warn!(%txn_id, "active transaction dropped, its write tokens stay held");
            return;
        }
        match self.rollback() {
            Ok(()) => tracing::warn!(%txn_id, "active transaction dropped, rolled back"),
            Err(err) => tracing::warn!(%txn_id, error = %err, "rollback on drop failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MemTxnManager {
        let manager = MemTxnManager::new();
        manager.preload("a", "a0").unwrap();
        manager
    }

    #[test]
    fn test_own_writes_are_visible() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        assert_eq!(txn.get("a").unwrap().unwrap().as_ref(), b"a0");

        txn.write("a", "a1").unwrap();
        assert_eq!(txn.get("a").unwrap().unwrap().as_ref(), b"a1");

        txn.write("fresh", "f1").unwrap();
        assert_eq!(txn.get("fresh").unwrap().unwrap().as_ref(), b"f1");
        assert_eq!(txn.write_set(), vec![Key::from("a"), Key::from("fresh")]);
        txn.commit().unwrap();
    }

    #[test]
    fn test_keys_created_after_begin_stay_hidden() {
        let manager = manager();
        let reader = manager.begin_transaction().unwrap();

        let writer = manager.begin_transaction().unwrap();
        writer.write("b", "b1").unwrap();
        writer.commit().unwrap();

        assert_eq!(reader.get("b").unwrap(), None);
        reader.commit().unwrap();

        let later = manager.begin_transaction().unwrap();
        assert_eq!(later.get("b").unwrap().unwrap().as_ref(), b"b1");
        later.commit().unwrap();
    }

    #[test]
    fn test_finalized_transaction_rejects_calls() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        txn.commit().unwrap();
        assert_eq!(txn.state(), TxnState::Committed);

        let expected = TransactionError::InvalidState {
            txn_id: txn.txn_id(),
            state: TxnState::Committed,
        };
        let StorageError::Transaction(err) = txn.get("a").unwrap_err();
        assert_eq!(err, expected);
        let StorageError::Transaction(err) = txn.write("a", "x").unwrap_err();
        assert_eq!(err, expected);
        let StorageError::Transaction(err) = txn.commit().unwrap_err();
        assert_eq!(err, expected);
        let StorageError::Transaction(err) = txn.rollback().unwrap_err();
        assert_eq!(err, expected);

        // The rejected write left no trace
        assert_eq!(manager.store().record("a").unwrap().len(), 1);
    }

    #[test]
    fn test_read_only_commit_deregisters() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        assert!(manager.registry().is_active(txn.txn_id()));
        txn.commit().unwrap();
        assert!(!manager.registry().is_active(txn.txn_id()));
        assert_eq!(manager.low_watermark(), None);
    }

    #[test]
    fn test_rollback_restores_chain() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        txn.write("a", "v1").unwrap();
        txn.write("a", "v2").unwrap();
        txn.write("new", "n1").unwrap();
        txn.rollback().unwrap();

        let record = manager.store().record("a").unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.token_holder(), None);
        // A key created by the rolled back transaction stays with an empty chain
        let record = manager.store().record("new").unwrap();
        assert!(record.is_empty());
        assert_eq!(record.token_holder(), None);

        let next = manager.begin_transaction().unwrap();
        assert_eq!(next.get("new").unwrap(), None);
        assert_eq!(next.get("a").unwrap().unwrap().as_ref(), b"a0");
        next.commit().unwrap();
    }

    #[test]
    fn test_drop_rolls_back() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        let txn_id = txn.txn_id();
        txn.write("a", "lost").unwrap();
        drop(txn);

        assert!(!manager.registry().is_active(txn_id));
        let record = manager.store().record("a").unwrap();
        assert_eq!(record.token_holder(), None);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_rollback_conflict_discards_own_versions() {
        let manager = manager();
        let t1 = manager.begin_transaction().unwrap();
        t1.write("a", "t1").unwrap();
        // Break the token protocol so another writer can stack on top
        let record = manager.store().record("a").unwrap();
        assert!(record.token().release(t1.txn_id()));

        let t2 = manager.begin_transaction().unwrap();
        t2.write("a", "t2").unwrap();

        let StorageError::Transaction(err) = t1.rollback().unwrap_err();
        assert_eq!(
            err,
            TransactionError::RollbackConflict {
                key: Key::from("a"),
                txn_id: t1.txn_id(),
                tail: Some(t2.txn_id()),
            }
        );
        assert_eq!(t1.state(), TxnState::RolledBack);
        assert!(!manager.registry().is_active(t1.txn_id()));
        assert!(record.versions().iter().all(|v| v.creator() != t1.txn_id()));
        // The other writer's token is untouched
        assert_eq!(record.token_holder(), Some(t2.txn_id()));

        t2.rollback().unwrap();
        let reader = manager.begin_transaction().unwrap();
        assert_eq!(reader.get("a").unwrap().unwrap().as_ref(), b"a0");
        reader.commit().unwrap();
    }

    #[test]
    fn test_commit_reports_lost_token() {
        let manager = manager();
        let txn = manager.begin_transaction().unwrap();
        txn.write("a", "a1").unwrap();
        let record = manager.store().record("a").unwrap();
        assert!(record.token().release(txn.txn_id()));

        let StorageError::Transaction(err) = txn.commit().unwrap_err();
        assert_eq!(
            err,
            TransactionError::TokenNotHeld {
                key: Key::from("a"),
                txn_id: txn.txn_id(),
            }
        );
        // Still finalized and deregistered
        assert_eq!(txn.state(), TxnState::Committed);
        assert!(!manager.registry().is_active(txn.txn_id()));

        let reader = manager.begin_transaction().unwrap();
        assert_eq!(reader.get("a").unwrap().unwrap().as_ref(), b"a1");
        reader.commit().unwrap();
    }
}
