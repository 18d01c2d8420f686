use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rrkv_storage::{MemTransaction, MemTxnManager, StoreConfig, Value};

/// How long a test waits before concluding that a writer is blocked.
pub const BLOCK_WAIT: Duration = Duration::from_millis(150);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn create_empty_store() -> MemTxnManager {
    init_tracing();
    MemTxnManager::with_config(StoreConfig {
        slow_token_wait: Duration::from_secs(5),
        ..Default::default()
    })
}

/// A store where key "a" holds the committed value "a0".
#[allow(dead_code)]
pub fn create_test_store() -> MemTxnManager {
    let store = create_empty_store();
    store.preload("a", "a0").unwrap();
    store
}

#[allow(dead_code)]
pub fn read(txn: &MemTransaction, key: &str) -> Option<String> {
    txn.get(key)
        .unwrap()
        .map(|value| String::from_utf8(value.to_vec()).unwrap())
}

/// Run `txn.write(key, value)` on another thread. The returned flag flips once the
/// write has returned.
#[allow(dead_code)]
pub fn spawn_write(
    txn: Arc<MemTransaction>,
    key: &'static str,
    value: &'static str,
) -> (JoinHandle<Arc<MemTransaction>>, Arc<AtomicBool>) {
    let done = Arc::new(AtomicBool::new(false));
    let handle = {
        let done = done.clone();
        thread::spawn(move || {
            txn.write(key, Value::from_static(value.as_bytes())).unwrap();
            done.store(true, Ordering::SeqCst);
            txn
        })
    };
    (handle, done)
}
