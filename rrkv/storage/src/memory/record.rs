use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rrkv_transaction::{Snapshot, TxnId};

use super::{Key, Value};

/// One immutable value of a key, tagged with the transaction that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    key: Key,
    value: Value,
    creator: TxnId,
}

impl Version {
    pub fn new(key: Key, value: Value, creator: TxnId) -> Self {
        Self {
            key,
            value,
            creator,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn creator(&self) -> TxnId {
        self.creator
    }
}

/// Outcome of [`WriteToken::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenGrant {
    /// The caller already held the token.
    Reentrant,
    /// The token was free, or became free after `waited`.
    Granted { waited: Option<Duration> },
}

/// Exclusive, owner-aware write permission for one key.
///
/// Unlike a mutex guard the token is not tied to a scope: a transaction takes
/// it on its first write to the key and gives it back when it finalizes.
#[derive(Debug)]
pub struct WriteToken {
    holder: Mutex<Option<TxnId>>,
    released: Condvar,
}

impl WriteToken {
    pub fn new() -> Self {
        Self {
            holder: Mutex::new(None),
            released: Condvar::new(),
        }
    }

    fn held_by(txn_id: TxnId) -> Self {
        Self {
            holder: Mutex::new(Some(txn_id)),
            released: Condvar::new(),
        }
    }

    /// Take the token for `txn_id`, blocking while another transaction holds it.
    pub fn acquire(&self, txn_id: TxnId) -> TokenGrant {
        let mut holder = self.holder.lock();
        match *holder {
            Some(current) if current == txn_id => return TokenGrant::Reentrant,
            None => {
                *holder = Some(txn_id);
                return TokenGrant::Granted { waited: None };
            }
            Some(_) => {}
        }

        let start = Instant::now();
        while holder.is_some() {
            self.released.wait(&mut holder);
        }
        *holder = Some(txn_id);
        TokenGrant::Granted {
            waited: Some(start.elapsed()),
        }
    }

    /// Give the token back. Returns false if `txn_id` was not the holder, in which
    /// case nothing changes.
    pub fn release(&self, txn_id: TxnId) -> bool {
        let mut holder = self.holder.lock();
        if *holder != Some(txn_id) {
            return false;
        }
        *holder = None;
        self.released.notify_one();
        true
    }

    pub fn holder(&self) -> Option<TxnId> {
        *self.holder.lock()
    }
}

impl Default for WriteToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The version chain of one key, oldest first, together with its write token.
///
/// Only the token holder appends to the chain, and only a rolling back
/// transaction removes versions, and only its own.
#[derive(Debug)]
pub struct Record {
    key: Key,
    chain: RwLock<Vec<Version>>,
    token: WriteToken,
}

impl Record {
    /// A record holding an already committed value and a free token.
    pub(super) fn committed(key: Key, value: Value) -> Self {
        let version = Version::new(key.clone(), value, TxnId::BOOTSTRAP);
        Self {
            key,
            chain: RwLock::new(vec![version]),
            token: WriteToken::new(),
        }
    }

    /// A record created by a write of `txn_id`, which holds the token from the
    /// start.
    pub(super) fn created_by(key: Key, value: Value, txn_id: TxnId) -> Self {
        let version = Version::new(key.clone(), value, txn_id);
        Self {
            key,
            chain: RwLock::new(vec![version]),
            token: WriteToken::held_by(txn_id),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// A copy of the chain, oldest first.
    pub fn versions(&self) -> Vec<Version> {
        self.chain.read().clone()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    pub fn token_holder(&self) -> Option<TxnId> {
        self.token.holder()
    }

    pub(super) fn token(&self) -> &WriteToken {
        &self.token
    }

    /// Newest version visible under `snapshot`.
    pub fn read_visible(&self, snapshot: &Snapshot) -> Option<Version> {
        let chain = self.chain.read();
        let visible = chain
            .iter()
            .rev()
            .find(|version| snapshot.is_visible(version.creator()))
            .cloned();
        tracing::trace!(
            key = %self.key,
            txn_id = %snapshot.txn_id(),
            creator = ?visible.as_ref().map(Version::creator),
            "visibility scan"
        );
        visible
    }

    pub(super) fn append(&self, version: Version) {
        debug_assert_eq!(self.token.holder(), Some(version.creator()));
        tracing::trace!(key = %self.key, creator = %version.creator(), "version appended");
        self.chain.write().push(version);
    }

    pub(super) fn tail_creator(&self) -> Option<TxnId> {
        self.chain.read().last().map(Version::creator)
    }

    /// Remove the trailing versions created by `txn_id`, returning how many were
    /// removed. Stops at the first version written by someone else.
    pub(super) fn truncate_created_by(&self, txn_id: TxnId) -> usize {
        let mut chain = self.chain.write();
        let keep = chain
            .iter()
            .rposition(|version| version.creator() != txn_id)
            .map_or(0, |pos| pos + 1);
        let removed = chain.len() - keep;
        chain.truncate(keep);
        removed
    }

    /// Remove every version created by `txn_id`, wherever it sits in the chain.
    pub(super) fn remove_created_by(&self, txn_id: TxnId) -> usize {
        let mut chain = self.chain.write();
        let before = chain.len();
        chain.retain(|version| version.creator() != txn_id);
        before - chain.len()
    }
}
