use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::store::{KeyValueStore, ObjectMeta};

struct Entry {
    body: Vec<u8>,
    modified: jiff::Timestamp,
}

/// Process-local store. Used offline and as the substitute backend in tests.
///
/// Modification times are strictly increasing across writes so "newest"
/// is well defined even when writes land within the same clock tick.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Entry>>,
    clock: Mutex<Option<jiff::Timestamp>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls since creation.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn tick(&self) -> jiff::Timestamp {
        let mut last = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = jiff::Timestamp::now();
        let next = match *last {
            Some(prev) if now <= prev => prev
                .checked_add(jiff::SignedDuration::from_nanos(1))
                .unwrap_or(prev),
            _ => now,
        };
        *last = Some(next);
        next
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).map(|e| e.body.clone()))
    }

    async fn set(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let modified = self.tick();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), Entry { body, modified });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| ObjectMeta {
                key: key.clone(),
                size: entry.body.len() as u64,
                last_modified: Some(entry.modified),
            })
            .collect())
    }
}
