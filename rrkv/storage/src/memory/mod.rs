pub mod record;
pub mod store;
pub mod transaction;
pub mod txn_manager;

use bytes::Bytes;
use smol_str::SmolStr;

pub type Key = SmolStr;
pub type Value = Bytes;

// Re-export commonly used types
pub use record::{Record, TokenGrant, Version, WriteToken};
pub use store::{CatalogView, VersionStore};
pub use transaction::MemTransaction;
pub use txn_manager::MemTxnManager;
