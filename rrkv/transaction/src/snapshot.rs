use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::txn_id::TxnId;

/// The view a transaction reads against, fixed at begin.
///
/// `min_active` is the smallest id active when the snapshot was taken and
/// `max_active` is one past the largest. Every id in `[min_active, max_active)`
/// that is listed in `active_ids` belonged to a transaction that had not
/// finalized yet, so its versions are invisible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    txn_id: TxnId,
    min_active: TxnId,
    max_active: TxnId,
    /// Sorted ascending.
    active_ids: Arc<[TxnId]>,
}

impl Snapshot {
    pub(crate) fn new(txn_id: TxnId, active_ids: Vec<TxnId>) -> Self {
        debug_assert!(active_ids.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(active_ids.binary_search(&txn_id).is_ok());
        let min_active = active_ids.first().copied().unwrap_or(txn_id);
        let max_active = active_ids.last().copied().unwrap_or(txn_id).successor();
        Self {
            txn_id,
            min_active,
            max_active,
            active_ids: active_ids.into(),
        }
    }

    /// Id of the transaction owning this snapshot.
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    pub fn min_active(&self) -> TxnId {
        self.min_active
    }

    pub fn max_active(&self) -> TxnId {
        self.max_active
    }

    /// Ids that were active when the snapshot was taken, owner included.
    pub fn active_ids(&self) -> &[TxnId] {
        &self.active_ids
    }

    /// Returns whether a version created by `creator` is visible.
    pub fn is_visible(&self, creator: TxnId) -> bool {
        if creator < self.min_active || creator == self.txn_id {
            return true;
        }
        if creator >= self.max_active {
            return false;
        }
        self.active_ids.binary_search(&creator).is_err()
    }
}
