use rrkv_transaction::{RegistryError, TxnId, TxnState};
use smol_str::SmolStr;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction {txn_id} is already {state}")]
    InvalidState { txn_id: TxnId, state: TxnState },
    #[error("Write token of key {key:?} is not held by {txn_id}")]
    TokenNotHeld { key: SmolStr, txn_id: TxnId },
    #[error("Rollback conflict on key {key:?}: tail version created by {tail:?}, expected {txn_id}")]
    RollbackConflict {
        key: SmolStr,
        txn_id: TxnId,
        tail: Option<TxnId>,
    },
    #[error("Key {0:?} already exists")]
    KeyExists(SmolStr),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
