//! Per-record serialisation of read-modify-write cycles.
//!
//! Updates to one opinion or desire must not race; unrelated records proceed
//! in parallel. Each identifier gets its own async mutex, created on demand
//! and dropped once nobody holds or awaits it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct RecordLocks {
    inner: Arc<Mutex<HashMap<Uuid, Weak<AsyncMutex<()>>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `id`. Held until the guard is dropped.
    pub async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, weak| weak.strong_count() > 0);
            match map.get(&id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let created = Arc::new(AsyncMutex::new(()));
                    map.insert(id, Arc::downgrade(&created));
                    created
                }
            }
        };
        mutex.lock_owned().await
    }

    /// Number of identifiers currently locked or awaited.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.values().filter(|w| w.strong_count() > 0).count()
    }
}

impl std::fmt::Debug for RecordLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLocks").field("active", &self.active()).finish()
    }
}
