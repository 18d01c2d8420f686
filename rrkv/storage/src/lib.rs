//! In-memory multi-version key-value storage with repeatable-read transactions.
//!
//! Readers never wait for writers: every transaction reads the versions that
//! were committed when it began. Writers of the same key are serialized by a
//! per-key write token held until the writer commits or rolls back.

pub mod config;
pub mod error;
pub mod memory;

pub use config::StoreConfig;
pub use error::{StorageError, StorageResult, TransactionError};
pub use memory::{Key, MemTransaction, MemTxnManager, Record, Value, Version, VersionStore};
pub use rrkv_transaction::{Snapshot, Transaction, TxnId, TxnManager, TxnState};
