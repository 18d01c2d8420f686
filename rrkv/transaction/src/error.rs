use thiserror::Error;

use crate::txn_id::TxnId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxnIdError {
    #[error("txn-id overflow, reached {0}")]
    Overflow(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("transaction {0} is not active")]
    NotActive(TxnId),

    #[error("txn-id error: {0}")]
    TxnId(#[from] TxnIdError),
}
