//! Transaction trait and related functionality
//!
//! This module defines the core transaction interface and the lifecycle states
//! a transaction moves through.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;
use crate::txn_id::TxnId;

/// Lifecycle state of a transaction. `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnState {
    Active,
    Committed,
    RolledBack,
}

impl TxnState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxnState::Active)
    }
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxnState::Active => "active",
            TxnState::Committed => "committed",
            TxnState::RolledBack => "rolled back",
        };
        f.write_str(s)
    }
}

/// Trait defining the core operations that all transactions must support.
pub trait Transaction: Send + Sync {
    /// The error type for transaction operations
    type Error;

    /// Get the transaction ID
    fn txn_id(&self) -> TxnId;

    /// Get the snapshot captured at begin
    fn snapshot(&self) -> &Snapshot;

    /// Get the current lifecycle state
    fn state(&self) -> TxnState;

    /// Make all writes visible and release the write tokens held
    fn commit(&self) -> Result<(), Self::Error>;

    /// Discard all writes and release the write tokens held
    fn rollback(&self) -> Result<(), Self::Error>;
}
