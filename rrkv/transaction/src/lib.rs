//! Transaction infrastructure for the rrkv store.
//!
//! This crate owns transaction ids, snapshots and the registry of active
//! transactions. It knows nothing about keys or values; the storage crate
//! builds version chains on top of it.

pub mod error;
pub mod manager;
pub mod registry;
pub mod snapshot;
pub mod transaction;
pub mod txn_id;

pub use error::{RegistryError, TxnIdError};
pub use manager::TxnManager;
pub use registry::TransactionRegistry;
pub use snapshot::Snapshot;
pub use transaction::{Transaction, TxnState};
pub use txn_id::{TransactionIdGenerator, TxnId};
