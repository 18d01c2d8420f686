//! Transaction id issuance
//!
//! Every transaction is identified by a [`TxnId`] drawn from a
//! [`TransactionIdGenerator`]. Ids double as version tags: a version created by
//! a transaction carries that transaction's id, and the visibility rules compare
//! those ids against a reader's [`Snapshot`](crate::snapshot::Snapshot).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::TxnIdError;

/// Identifier of a transaction, strictly increasing in issuance order.
///
/// [`TxnId::BOOTSTRAP`] is reserved for data loaded before any transaction
/// runs. It sorts below every issued id, so bootstrap versions are visible to
/// every transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TxnId(u64);

impl TxnId {
    /// Creator id of preloaded, already committed versions.
    pub const BOOTSTRAP: TxnId = TxnId(0);
    /// The first id a fresh generator hands out.
    pub const FIRST: u64 = 1;

    /// Create a txn-id from a raw value.
    pub fn with_id(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value of the id.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Returns true if this id tags bootstrap data.
    pub fn is_bootstrap(&self) -> bool {
        *self == Self::BOOTSTRAP
    }

    /// The id right after this one.
    pub(crate) fn successor(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

/// Lock-free transaction id generator.
pub struct TransactionIdGenerator {
    counter: AtomicU64,
}

impl TransactionIdGenerator {
    /// Create a new transaction ID generator
    pub fn new() -> Self {
        Self::with_start(TxnId::FIRST)
    }

    /// Create a generator starting at `start`. A start below [`TxnId::FIRST`] is
    /// raised to it so that issued ids never collide with [`TxnId::BOOTSTRAP`].
    pub fn with_start(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start.max(TxnId::FIRST)),
        }
    }

    /// Generate the next transaction ID. Never blocks.
    pub fn next(&self) -> Result<TxnId, TxnIdError> {
        let mut cur = self.counter.load(Ordering::SeqCst);
        loop {
            if cur == u64::MAX {
                return Err(TxnIdError::Overflow(cur));
            }
            match self.counter.compare_exchange_weak(
                cur,
                cur + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(TxnId::with_id(cur)),
                Err(actual) => cur = actual,
            }
        }
    }

    /// The id the next call to [`next`](Self::next) would return.
    pub fn peek(&self) -> TxnId {
        TxnId::with_id(self.counter.load(Ordering::SeqCst))
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
