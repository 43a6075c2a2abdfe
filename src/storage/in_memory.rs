use super::ObjectStore;
use crate::error::{PortalError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory object store for development/testing. Records every delete call
/// so tests can assert cascade deletion, and can be switched to fail writes
/// to exercise best-effort paths.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_writes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `put` and `delete` returns an error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Keys passed to `delete`, in call order.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalError::Store {
                message: format!("PUT {} failed: writes disabled", key),
            });
        }
        debug!("Stored object: {} ({} bytes)", key, bytes.len());
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalError::Store {
                message: format!("DELETE {} failed: writes disabled", key),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
