//! Transaction manager trait
//!
//! A manager owns the shared state every transaction of one store works
//! against and hands out transactions bound to it.

use std::sync::Arc;

use crate::TxnId;
use crate::transaction::Transaction;

pub trait TxnManager {
    /// The transaction type that this manager handles
    type Transaction: Transaction + Send + Sync;
    /// The error type for operations
    type Error;

    /// Begin a new transaction: issue its id, register it as active and capture its
    /// snapshot.
    fn begin_transaction(&self) -> Result<Arc<Self::Transaction>, Self::Error>;

    /// Unregister a transaction when it commits or rolls back.
    fn finish_transaction(&self, txn: &Self::Transaction) -> Result<(), Self::Error>;

    /// The id of the oldest active transaction, if any.
    fn low_watermark(&self) -> Option<TxnId>;
}
